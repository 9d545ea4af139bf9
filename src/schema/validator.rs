//! Record validator
//!
//! Validation semantics:
//! - Candidate must be a record; undeclared fields are rejected
//! - `null` is treated as an absent value
//! - Absent fields take their resolved default; absent required fields
//!   without a default fail with missing-field
//! - Present fields are checked for kind, refinements, then custom hooks
//! - Records and arrays are descended recursively
//! - Entity checks run last, on the normalized document
//!
//! Validation is deterministic and never mutates the candidate. The output
//! is a new, fully defaulted document; feeding it back in yields itself.

use serde_json::{Map, Value};

use crate::observability::{log_event, Event};

use super::checkers;
use super::conditions;
use super::errors::{ValidationError, ValidationErrors, ValidationResult};
use super::reference::ExistenceResolver;
use super::types::{EntitySchema, FieldDef, FieldKind};

/// How many errors a validation call reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Stop at the first error
    #[default]
    FailFast,
    /// Collect every independent error
    Collect,
}

/// Validates candidate documents against one entity schema.
///
/// Holds only shared references; any number of validators may run against
/// the same schema concurrently.
pub struct SchemaValidator<'a> {
    schema: &'a EntitySchema,
    resolver: Option<&'a dyn ExistenceResolver>,
    mode: ValidationMode,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a fail-fast validator without an existence resolver.
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self {
            schema,
            resolver: None,
            mode: ValidationMode::FailFast,
        }
    }

    /// Checks foreign references for existence, not only shape.
    pub fn with_resolver(mut self, resolver: &'a dyn ExistenceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        self.schema
    }

    /// Validates a candidate document and returns its normalized form.
    ///
    /// # Errors
    ///
    /// Returns the discovered `ValidationErrors`: one in fail-fast mode,
    /// all of them in collect mode. The document is rejected as a whole.
    pub fn validate(&self, candidate: &Value) -> ValidationResult<Value> {
        let mut pass = Pass::new(self.mode, self.resolver);

        let document = match candidate.as_object() {
            Some(obj) => pass.record(self.schema.fields(), obj, ""),
            None => {
                pass.report(ValidationError::type_mismatch("$root", "expected a record", candidate));
                Map::new()
            }
        };

        if !pass.halted() {
            let document = Value::Object(document);
            for error in conditions::evaluate(self.schema.checks(), &document, &pass.errors) {
                pass.report(error);
                if pass.halted() {
                    break;
                }
            }
            if pass.errors.is_empty() {
                log_event(Event::DocumentValidated, &[("entity", self.schema.name())]);
                return Ok(document);
            }
        }

        let count = pass.errors.len().to_string();
        log_event(
            Event::DocumentRejected,
            &[("entity", self.schema.name()), ("errors", count.as_str())],
        );
        Err(pass.errors)
    }
}

/// Fail-fast validation without an existence resolver.
pub fn validate(schema: &EntitySchema, candidate: &Value) -> ValidationResult<Value> {
    SchemaValidator::new(schema).validate(candidate)
}

/// Batch validation: every independent error is reported.
pub fn validate_all(schema: &EntitySchema, candidate: &Value) -> ValidationResult<Value> {
    SchemaValidator::new(schema)
        .with_mode(ValidationMode::Collect)
        .validate(candidate)
}

/// Validates one value against one field definition, shape only. Used to
/// verify declared defaults at construction time.
pub(crate) fn check_value(field: &FieldDef, value: &Value, path: &str) -> ValidationResult<Value> {
    let mut pass = Pass::new(ValidationMode::Collect, None);
    match pass.field(field, value, path) {
        Some(v) if pass.errors.is_empty() => Ok(v),
        _ => Err(pass.errors),
    }
}

/// State of one validation call
struct Pass<'r> {
    mode: ValidationMode,
    resolver: Option<&'r dyn ExistenceResolver>,
    errors: ValidationErrors,
}

impl<'r> Pass<'r> {
    fn new(mode: ValidationMode, resolver: Option<&'r dyn ExistenceResolver>) -> Self {
        Self {
            mode,
            resolver,
            errors: ValidationErrors::new(),
        }
    }

    fn report(&mut self, error: ValidationError) {
        if !self.halted() {
            self.errors.push(error);
        }
    }

    fn halted(&self) -> bool {
        self.mode == ValidationMode::FailFast && !self.errors.is_empty()
    }

    /// Validates a record's fields in declaration order.
    fn record(&mut self, fields: &[FieldDef], obj: &Map<String, Value>, prefix: &str) -> Map<String, Value> {
        for (key, value) in obj {
            if !fields.iter().any(|f| f.name == *key) {
                self.report(ValidationError::unknown_field(make_path(prefix, key), value));
            }
        }

        let mut out = Map::new();
        for def in fields {
            if self.halted() {
                break;
            }
            let path = make_path(prefix, &def.name);

            match obj.get(&def.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    if let Some(v) = self.field(def, value, &path) {
                        out.insert(def.name.clone(), v);
                    }
                }
                None => match def.resolved_default() {
                    Some(default) => {
                        out.insert(def.name.clone(), default.clone());
                    }
                    None if def.required => self.report(ValidationError::missing_field(path)),
                    // An absent record is checked as an empty one
                    None if def.is_record() => {
                        if let Some(v) = self.field(def, &Value::Object(Map::new()), &path) {
                            out.insert(def.name.clone(), v);
                        }
                    }
                    None => {}
                },
            }
        }
        out
    }

    /// Validates one present value; returns its normalized form on success.
    fn field(&mut self, def: &FieldDef, value: &Value, path: &str) -> Option<Value> {
        let before = self.errors.len();

        let normalized = match &def.kind {
            FieldKind::Record { fields, .. } => {
                let Some(obj) = value.as_object() else {
                    self.report(ValidationError::type_mismatch(path, checkers::expected_kind(&def.kind), value));
                    return None;
                };
                let out = self.record(fields, obj, path);
                if self.errors.len() > before {
                    return None;
                }
                Value::Object(out)
            }
            FieldKind::Array { elements } => {
                let Some(items) = value.as_array() else {
                    self.report(ValidationError::type_mismatch(path, checkers::expected_kind(&def.kind), value));
                    return None;
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if self.halted() {
                        break;
                    }
                    let elem_path = format!("{}[{}]", path, i);
                    if item.is_null() {
                        self.report(ValidationError::type_mismatch(
                            elem_path,
                            checkers::expected_kind(&elements.kind),
                            item,
                        ));
                        continue;
                    }
                    if let Some(v) = self.field(elements, item, &elem_path) {
                        out.push(v);
                    }
                }
                if self.errors.len() > before {
                    return None;
                }
                Value::Array(out)
            }
            scalar => match checkers::check_scalar(scalar, value) {
                Ok(v) => v,
                Err(reason) => {
                    self.report(ValidationError::type_mismatch(path, reason, value));
                    return None;
                }
            },
        };

        if let Err(reason) = checkers::check_refinements(&normalized, &def.constraints) {
            self.report(ValidationError::type_mismatch(path, reason, value));
            return None;
        }

        if let Some(hook) = def.custom_validator {
            if let Err(message) = hook(&normalized) {
                self.report(ValidationError::custom(path, message, value));
                return None;
            }
        }

        if let (FieldKind::Foreign { reference }, Some(resolver)) = (&def.kind, self.resolver) {
            if let Some(id) = normalized.get("id").and_then(Value::as_str) {
                if !resolver.exists(reference, id) {
                    self.report(ValidationError::reference_not_found(path, reference, id));
                    return None;
                }
            }
        }

        Some(match def.normalizer {
            Some(normalize) => normalize(normalized),
            None => normalized,
        })
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
