//! Schema error types
//!
//! Two families of errors live here:
//! - `SchemaError`: raised while building defined types, schemas and the
//!   catalog. Always FATAL; a schema that cannot be built aborts startup.
//! - `ValidationError`: raised while validating a candidate document.
//!   Always REJECT; returned to the caller as data.
//!
//! Validation error kinds:
//! - missing-field
//! - type-mismatch
//! - unknown-field
//! - custom-validation
//! - conditional-violation
//! - distinct-violation
//! - reference-not-found

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Candidate document rejected
    Reject,
    /// Process must not start
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised while constructing defined types, entity schemas or the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields with the same name inside one record
    #[error("schema '{schema}': duplicate field '{field}'")]
    DuplicateField { schema: String, field: String },

    /// Primary key names a field that is not declared
    #[error("schema '{schema}': primary key field '{field}' is not declared")]
    UnknownPrimaryKey { schema: String, field: String },

    /// Entity check names a field path that is not declared
    #[error("schema '{schema}': entity check references undeclared field '{field}'")]
    UnknownCheckField { schema: String, field: String },

    /// Dotted default path does not resolve against the default tree
    #[error("schema '{schema}': default path '{path}' does not resolve (missing segment '{segment}')")]
    UnresolvedDefault {
        schema: String,
        path: String,
        segment: String,
    },

    /// Field inherits a default but no enclosing record declares a default tree
    #[error("schema '{schema}': field '{path}' inherits a default but no enclosing record declares a default tree")]
    NoDefaultTree { schema: String, path: String },

    /// Declared default does not satisfy the field's own constraints
    #[error("schema '{schema}': default of field '{path}' is invalid: {reason}")]
    InvalidDefault {
        schema: String,
        path: String,
        reason: String,
    },

    /// Default tree attached to a field that is not a record
    #[error("schema '{schema}': field '{field}' is not a record and cannot carry a default tree")]
    MisplacedDefaultTree { schema: String, field: String },

    /// Default tree is not a document
    #[error("default tree must be an object, got {found}")]
    MalformedDefaultTree { found: String },

    /// Field references a defined type that was never registered
    #[error("unknown defined type '{0}'")]
    UnknownType(String),

    /// Defined type registered twice
    #[error("defined type '{0}' is already registered")]
    DuplicateType(String),

    /// Entity schema registered twice
    #[error("entity schema '{0}' is already registered")]
    DuplicateSchema(String),

    /// Entity schema lookup failed
    #[error("entity schema '{0}' not found")]
    UnknownSchema(String),

    /// Regular expression failed to compile
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl SchemaError {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateField { .. } => "LBS_SCHEMA_DUPLICATE_FIELD",
            SchemaError::UnknownPrimaryKey { .. } => "LBS_SCHEMA_UNKNOWN_PRIMARY_KEY",
            SchemaError::UnknownCheckField { .. } => "LBS_SCHEMA_UNKNOWN_CHECK_FIELD",
            SchemaError::UnresolvedDefault { .. } => "LBS_SCHEMA_UNRESOLVED_DEFAULT",
            SchemaError::NoDefaultTree { .. } => "LBS_SCHEMA_NO_DEFAULT_TREE",
            SchemaError::InvalidDefault { .. } => "LBS_SCHEMA_INVALID_DEFAULT",
            SchemaError::MisplacedDefaultTree { .. } => "LBS_SCHEMA_MISPLACED_DEFAULT_TREE",
            SchemaError::MalformedDefaultTree { .. } => "LBS_SCHEMA_MALFORMED_DEFAULT_TREE",
            SchemaError::UnknownType(_) => "LBS_SCHEMA_UNKNOWN_TYPE",
            SchemaError::DuplicateType(_) => "LBS_SCHEMA_DUPLICATE_TYPE",
            SchemaError::DuplicateSchema(_) => "LBS_SCHEMA_DUPLICATE_SCHEMA",
            SchemaError::UnknownSchema(_) => "LBS_SCHEMA_UNKNOWN_SCHEMA",
            SchemaError::InvalidPattern { .. } => "LBS_SCHEMA_INVALID_PATTERN",
        }
    }

    /// Lookups of unknown schemas are caller errors; everything else is a
    /// broken declaration.
    pub fn severity(&self) -> Severity {
        match self {
            SchemaError::UnknownSchema(_) => Severity::Reject,
            _ => Severity::Fatal,
        }
    }

    /// Returns whether this error must abort startup
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for schema construction
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Kind of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Required field absent and no default available
    MissingField,
    /// Value does not match the field's kind or refinements
    TypeMismatch,
    /// Field not declared by the schema
    UnknownField,
    /// Custom validator hook rejected the value
    CustomValidation,
    /// Conditional entity check failed
    ConditionalViolation,
    /// Distinct entity check failed
    DistinctViolation,
    /// Foreign reference does not resolve
    ReferenceNotFound,
}

impl ErrorKind {
    /// Returns the kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingField => "missing-field",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::UnknownField => "unknown-field",
            ErrorKind::CustomValidation => "custom-validation",
            ErrorKind::ConditionalViolation => "conditional-violation",
            ErrorKind::DistinctViolation => "distinct-violation",
            ErrorKind::ReferenceNotFound => "reference-not-found",
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingField => "LBS_MISSING_FIELD",
            ErrorKind::TypeMismatch => "LBS_TYPE_MISMATCH",
            ErrorKind::UnknownField => "LBS_UNKNOWN_FIELD",
            ErrorKind::CustomValidation => "LBS_CUSTOM_VALIDATION",
            ErrorKind::ConditionalViolation => "LBS_CONDITIONAL_VIOLATION",
            ErrorKind::DistinctViolation => "LBS_DISTINCT_VIOLATION",
            ErrorKind::ReferenceNotFound => "LBS_REFERENCE_NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single validation failure with enough context to render a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Field path (e.g., "healthchecks.active.timeout", "tags[2]")
    pub field: String,
    /// What went wrong
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Expected type or condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Rejected value, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Field whose value triggered an entity check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl ValidationError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::MissingField,
            message: "required field missing".into(),
            expected: Some("field to be present".into()),
            actual: None,
            trigger: None,
        }
    }

    pub fn unknown_field(field: impl Into<String>, actual: &Value) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::UnknownField,
            message: "unknown field".into(),
            expected: Some("no undeclared fields".into()),
            actual: Some(actual.clone()),
            trigger: None,
        }
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: &Value) -> Self {
        let expected = expected.into();
        Self {
            field: field.into(),
            kind: ErrorKind::TypeMismatch,
            message: expected.clone(),
            expected: Some(expected),
            actual: Some(actual.clone()),
            trigger: None,
        }
    }

    pub fn custom(field: impl Into<String>, message: impl Into<String>, actual: &Value) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::CustomValidation,
            message: message.into(),
            expected: None,
            actual: Some(actual.clone()),
            trigger: None,
        }
    }

    pub fn conditional(
        then_field: impl Into<String>,
        if_field: impl Into<String>,
        rule: impl Into<String>,
        actual: Option<&Value>,
    ) -> Self {
        let if_field = if_field.into();
        let rule = rule.into();
        Self {
            field: then_field.into(),
            kind: ErrorKind::ConditionalViolation,
            message: format!(
                "failed conditional validation given value of field '{}': {}",
                if_field, rule
            ),
            expected: Some(rule),
            actual: actual.cloned(),
            trigger: Some(if_field),
        }
    }

    pub fn distinct(field: impl Into<String>, other: impl Into<String>, actual: &Value) -> Self {
        let other = other.into();
        Self {
            field: field.into(),
            kind: ErrorKind::DistinctViolation,
            message: format!("values of this field and '{}' must be distinct", other),
            expected: Some(format!("value different from '{}'", other)),
            actual: Some(actual.clone()),
            trigger: Some(other),
        }
    }

    pub fn reference_not_found(field: impl Into<String>, entity: &str, id: &str) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::ReferenceNotFound,
            message: format!("the referenced {} '{}' does not exist", entity, id),
            expected: Some(format!("existing {}", entity)),
            actual: Some(Value::String(id.to_string())),
            trigger: None,
        }
    }

    /// Validation errors are never fatal
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] field '{}': {}", self.kind, self.field, self.message)?;
        if let Some(ref actual) = self.actual {
            write!(f, " (got {})", actual)?;
        }
        Ok(())
    }
}

/// Ordered set of validation failures for one document
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error discovered
    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Returns the first error attributed to the given field path
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Returns whether any error of the given kind is attributed to the field
    pub fn has(&self, field: &str, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.field == field && e.kind == kind)
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document validation failed: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Result type for document validation
pub type ValidationResult<T> = Result<T, ValidationErrors>;
