//! CLI module
//!
//! Provides command-line interface for:
//! - validate: Validate one entity document from stdin
//! - defaults: Print an entity's canonical default document
//! - schemas: List registered entity schemas

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{defaults, run, run_command, schemas, validate, validate_document, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_rejection, write_response};
