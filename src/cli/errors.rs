//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit status.

use std::fmt;
use std::io;

use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Input document is not JSON
    InvalidInput,
    /// No schema registered under the requested entity name
    UnknownEntity,
    /// Schema catalog failed to build
    SchemaFailed,
    /// Document failed validation
    Rejected,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LBS_CLI_CONFIG_ERROR",
            Self::IoError => "LBS_CLI_IO_ERROR",
            Self::InvalidInput => "LBS_CLI_INVALID_INPUT",
            Self::UnknownEntity => "LBS_CLI_UNKNOWN_ENTITY",
            Self::SchemaFailed => "LBS_CLI_SCHEMA_FAILED",
            Self::Rejected => "LBS_CLI_VALIDATION_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Document rejected with `count` validation errors
    pub fn rejected(entity: &str, count: usize) -> Self {
        Self::new(
            CliErrorCode::Rejected,
            format!("{} document rejected with {} error(s)", entity, count),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        let code = match e {
            SchemaError::UnknownSchema(_) => CliErrorCode::UnknownEntity,
            _ => CliErrorCode::SchemaFailed,
        };
        Self::new(code, format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_mapping() {
        let err: CliError = SchemaError::UnknownSchema("services".into()).into();
        assert_eq!(err.code(), &CliErrorCode::UnknownEntity);
        assert!(err.message().contains("services"));

        let err: CliError = SchemaError::DuplicateSchema("targets".into()).into();
        assert_eq!(err.code(), &CliErrorCode::SchemaFailed);
        assert!(err.message().starts_with("LBS_SCHEMA_DUPLICATE_SCHEMA"));
    }

    #[test]
    fn test_display_includes_code() {
        let err = CliError::rejected("targets", 2);
        assert_eq!(
            err.to_string(),
            "LBS_CLI_VALIDATION_FAILED: targets document rejected with 2 error(s)"
        );
    }
}
