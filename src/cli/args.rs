//! CLI argument definitions using clap
//!
//! Commands:
//! - balancer-schema validate --entity <name> [--config <path>] [--all-errors]
//! - balancer-schema defaults --entity <name> [--config <path>]
//! - balancer-schema schemas [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Validate load balancer configuration entities
#[derive(Parser, Debug)]
#[command(name = "balancer-schema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON document read from stdin
    Validate {
        /// Entity schema to validate against (e.g. "upstreams")
        #[arg(long)]
        entity: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report every error instead of stopping at the first
        #[arg(long)]
        all_errors: bool,
    },

    /// Print the canonical default document of an entity
    Defaults {
        /// Entity schema name
        #[arg(long)]
        entity: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List registered entity schemas
    Schemas {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    pub fn config(&self) -> Option<&PathBuf> {
        match self {
            Command::Validate { config, .. }
            | Command::Defaults { config, .. }
            | Command::Schemas { config } => config.as_ref(),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
