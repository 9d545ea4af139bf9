//! Schema engine for configuration entities
//!
//! Entity schemas are declared once at startup and enforced on every
//! candidate document.
//!
//! # Design Principles
//!
//! - Declarations are checked at construction; broken schemas never start
//! - Defaults resolve eagerly from explicit default trees
//! - Validation is pure, deterministic and total
//! - Errors are data: path, kind, expected constraint, rejected value
//! - Schemas are immutable and shared read-only across threads

pub mod checkers;
pub mod conditions;
mod defaults;
mod errors;
pub mod hooks;
mod reference;
mod typedefs;
mod types;
mod validator;

pub use defaults::DefaultTree;
pub use errors::{
    ErrorKind, SchemaError, SchemaResult, Severity, ValidationError, ValidationErrors, ValidationResult,
};
pub use reference::{ExistenceResolver, KnownReferences};
pub use typedefs::{DefinedType, TypeRegistry};
pub use types::{
    Conditional, Constraints, CustomValidator, DefaultSpec, EntityCheck, EntitySchema, EntitySchemaBuilder,
    FieldDef, FieldKind, Match, Normalizer, Pattern,
};
pub use validator::{validate, validate_all, SchemaValidator, ValidationMode};
