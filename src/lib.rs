//! balancer-schema - Declarative schemas for load balancer entities
//!
//! Validates and normalizes upstream and target configuration documents
//! against immutable entity schemas with eagerly resolved defaults.

pub mod cli;
pub mod entities;
pub mod observability;
pub mod schema;

pub use entities::Catalog;
pub use schema::{
    validate, validate_all, EntitySchema, ErrorKind, SchemaError, SchemaValidator, ValidationError,
    ValidationErrors, ValidationMode,
};
