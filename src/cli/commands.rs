//! CLI command implementations
//!
//! Every command follows the same startup sequence:
//! 1. Load configuration (defaults when no file is given)
//! 2. Apply the log threshold
//! 3. Build the schema catalog; construction errors abort the process
//!
//! The catalog is read-only once built.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::Catalog;
use crate::observability::{log_event, Event, Logger, Severity};
use crate::schema::{KnownReferences, SchemaValidator, ValidationErrors, ValidationMode};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_rejection, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Report every validation error instead of the first (default: false)
    #[serde(default)]
    pub collect_all_errors: bool,

    /// Known primary keys per entity. When present, foreign references
    /// are checked for existence against this table.
    #[serde(default)]
    pub known_references: Option<BTreeMap<String, Vec<String>>>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            collect_all_errors: false,
            known_references: None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let path = path.display().to_string();
        log_event(Event::ConfigLoaded, &[("path", path.as_str())]);

        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        self.severity()?;

        if let Some(ref known) = self.known_references {
            for (entity, ids) in known {
                for id in ids {
                    Uuid::parse_str(id).map_err(|e| {
                        CliError::config_error(format!(
                            "Invalid id '{}' in known_references.{}: {}",
                            id, entity, e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            ))
        })
    }

    /// Existence resolver built from `known_references`, if configured.
    pub fn resolver(&self) -> Option<KnownReferences> {
        self.known_references.as_ref().map(|known| {
            let mut refs = KnownReferences::new();
            for (entity, ids) in known {
                for id in ids {
                    // Stored in the same canonical form references are normalized to
                    let canonical = Uuid::parse_str(id)
                        .map(|u| u.hyphenated().to_string())
                        .unwrap_or_else(|_| id.clone());
                    refs.insert(entity.clone(), canonical);
                }
            }
            refs
        })
    }

    pub fn mode(&self, all_errors: bool) -> ValidationMode {
        if all_errors || self.collect_all_errors {
            ValidationMode::Collect
        } else {
            ValidationMode::FailFast
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let config = Config::load_or_default(cmd.config().map(|p| p.as_path()))?;
    Logger::set_threshold(config.severity()?);

    let catalog = Catalog::builtin()?;

    match cmd {
        Command::Validate {
            entity, all_errors, ..
        } => validate(&catalog, &config, &entity, all_errors),
        Command::Defaults { entity, .. } => defaults(&catalog, &entity),
        Command::Schemas { .. } => schemas(&catalog),
    }
}

/// Validate the document on stdin and print the normalized result
pub fn validate(catalog: &Catalog, config: &Config, entity: &str, all_errors: bool) -> CliResult<()> {
    let document = match catalog.get(entity).map_err(CliError::from).and_then(|_| read_request()) {
        Ok(doc) => doc,
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            return Err(e);
        }
    };

    match validate_document(catalog, config, entity, &document, all_errors)? {
        Ok(normalized) => write_response(normalized),
        Err(errors) => {
            write_rejection(&errors)?;
            Err(CliError::rejected(entity, errors.len()))
        }
    }
}

/// Validates one document with the configured mode and resolver.
///
/// The outer `Result` fails only for an unknown entity; the inner one is
/// the validation outcome.
pub fn validate_document(
    catalog: &Catalog,
    config: &Config,
    entity: &str,
    document: &Value,
    all_errors: bool,
) -> CliResult<Result<Value, ValidationErrors>> {
    let schema = catalog.get(entity)?;
    let resolver = config.resolver();

    let mut validator = SchemaValidator::new(schema).with_mode(config.mode(all_errors));
    if let Some(ref refs) = resolver {
        validator = validator.with_resolver(refs);
    }
    Ok(validator.validate(document))
}

/// Print the canonical default document of an entity
pub fn defaults(catalog: &Catalog, entity: &str) -> CliResult<()> {
    let schema = catalog.get(entity)?;
    write_response(schema.default_document())
}

/// Print every registered schema with its primary key and field names
pub fn schemas(catalog: &Catalog) -> CliResult<()> {
    write_response(schema_listing(catalog))
}

fn schema_listing(catalog: &Catalog) -> Value {
    let listing: Vec<Value> = catalog
        .schemas()
        .map(|schema| {
            json!({
                "name": schema.name(),
                "primary_key": schema.primary_key(),
                "fields": schema.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                "checks": schema.checks().len(),
            })
        })
        .collect();
    Value::Array(listing)
}
