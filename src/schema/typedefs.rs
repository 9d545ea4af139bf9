//! Defined types
//!
//! Named, immutable constraint templates shared by many fields ("a port-like
//! integer between 0 and 65535"). Fields reference a defined type by name
//! while schemas are being declared; the lookup happens once and the field
//! receives its own copy.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::errors::{SchemaError, SchemaResult};
use super::hooks;
use super::types::{Constraints, CustomValidator, DefaultSpec, FieldDef, FieldKind};
use super::validator;

/// A reusable `{kind, constraints, default}` bundle
#[derive(Debug, Clone)]
pub struct DefinedType {
    name: String,
    kind: FieldKind,
    constraints: Constraints,
    default: Option<Value>,
    custom_validator: Option<CustomValidator>,
}

impl DefinedType {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            constraints: Constraints::default(),
            default: None,
            custom_validator: None,
        }
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn custom(mut self, validator: CustomValidator) -> Self {
        self.custom_validator = Some(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Instantiates a field of this type. The field may still override the
    /// default (`.default(..)`, `.inherit_default()`, `.no_default()`).
    pub fn field(&self, field_name: impl Into<String>) -> FieldDef {
        let mut field = FieldDef::new(field_name, self.kind.clone()).constraints(self.constraints.clone());
        field.custom_validator = self.custom_validator;
        if let Some(ref default) = self.default {
            field.default = DefaultSpec::Value(default.clone());
        }
        field
    }
}

/// Registry of defined types, immutable once built
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, DefinedType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a defined type.
    ///
    /// # Errors
    ///
    /// - `DuplicateType` if the name is taken
    /// - `InvalidDefault` if the type's default violates its own constraints
    pub fn define(&mut self, defined: DefinedType) -> SchemaResult<()> {
        if self.types.contains_key(&defined.name) {
            return Err(SchemaError::DuplicateType(defined.name));
        }

        if let Some(ref default) = defined.default {
            let field = defined.field(defined.name.clone());
            validator::check_value(&field, default, &defined.name).map_err(|errors| {
                SchemaError::InvalidDefault {
                    schema: "<types>".into(),
                    path: defined.name.clone(),
                    reason: errors
                        .first()
                        .map(|e| e.message.clone())
                        .unwrap_or_default(),
                }
            })?;
        }

        self.types.insert(defined.name.clone(), defined);
        Ok(())
    }

    pub fn get(&self, name: &str) -> SchemaResult<&DefinedType> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Shorthand for `get(type_name)?.field(field_name)`.
    pub fn field(&self, type_name: &str, field_name: impl Into<String>) -> SchemaResult<FieldDef> {
        Ok(self.get(type_name)?.field(field_name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Built-in defined types used by the balancer entities.
    pub fn builtin() -> SchemaResult<Self> {
        let mut registry = Self::new();

        registry.define(DefinedType::new("uuid", FieldKind::String).constraints(
            Constraints::new()
                .pattern("^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")?,
        ))?;

        registry.define(
            DefinedType::new("port", FieldKind::Integer).constraints(Constraints::new().between(0.0, 65535.0)),
        )?;

        registry.define(
            DefinedType::new("header_name", FieldKind::String).custom(hooks::validate_header_name),
        )?;

        registry.define(
            DefinedType::new("path", FieldKind::String).constraints(
                Constraints::new()
                    .starts_with("/")
                    .pattern(r"^/[A-Za-z0-9\-._~%!$&'()*+,;=:@/]*$")?,
            ),
        )?;

        registry.define(DefinedType::new("sni", FieldKind::String).custom(hooks::validate_sni))?;

        registry.define(DefinedType::new(
            "tags",
            FieldKind::Array {
                elements: Box::new(FieldDef::element(FieldKind::String).len_min(1)),
            },
        ))?;

        registry.define(DefinedType::new(
            "http_statuses",
            FieldKind::Array {
                elements: Box::new(FieldDef::element(FieldKind::Integer).between(100.0, 999.0)),
            },
        ))?;

        registry.define(
            DefinedType::new("seconds", FieldKind::Number).constraints(Constraints::new().between(0.0, 65535.0)),
        )?;

        registry.define(
            DefinedType::new("positive_int", FieldKind::Integer)
                .constraints(Constraints::new().between(1.0, 2147483648.0)),
        )?;

        registry.define(
            DefinedType::new("positive_int_or_zero", FieldKind::Integer)
                .constraints(Constraints::new().between(0.0, 2147483648.0)),
        )?;

        registry.define(
            DefinedType::new("check_type", FieldKind::String)
                .constraints(Constraints::new().one_of(["tcp", "http", "https"]))
                .default("http"),
        )?;

        registry.define(
            DefinedType::new("hash_on", FieldKind::String)
                .constraints(Constraints::new().one_of(["none", "consumer", "ip", "header", "cookie"]))
                .default("none"),
        )?;

        registry.define(
            DefinedType::new("https_verify_certificate", FieldKind::Boolean).default(json!(true)),
        )?;

        Ok(registry)
    }
}
