//! Schema type definitions
//!
//! Supported field kinds:
//! - string: UTF-8 string
//! - integer: 64-bit signed integer
//! - number: 64-bit floating point
//! - boolean: Boolean
//! - array: Homogeneous array with an element definition
//! - record: Nested record with its own ordered field list
//! - foreign: Reference to another entity by primary key

use regex::Regex;
use serde_json::{Map, Value};

use super::defaults::{self, DefaultTree};
use super::errors::{SchemaError, SchemaResult};

/// Custom field validator, invoked on an already type-checked value.
pub type CustomValidator = fn(&Value) -> Result<(), String>;

/// Rewrites an accepted value into its canonical form.
pub type Normalizer = fn(Value) -> Value;

/// Compiled regular expression used by `pattern` refinements
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> SchemaResult<Self> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Refinements shared by field definitions, defined types and entity checks
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Inclusive numeric range
    pub between: Option<(f64, f64)>,
    /// Enumerated values
    pub one_of: Option<Vec<Value>>,
    /// Regular expression a string must match
    pub pattern: Option<Pattern>,
    /// Minimum length of a string or array
    pub len_min: Option<usize>,
    /// Required string prefix
    pub starts_with: Option<String>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(mut self, lo: f64, hi: f64) -> Self {
        self.between = Some((lo, hi));
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> SchemaResult<Self> {
        self.pattern = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn len_min(mut self, len: usize) -> Self {
        self.len_min = Some(len);
        self
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = Some(prefix.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.between.is_none()
            && self.one_of.is_none()
            && self.pattern.is_none()
            && self.len_min.is_none()
            && self.starts_with.is_none()
    }
}

/// Where a field's default comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSpec {
    /// No default; absent optional fields stay absent
    None,
    /// Explicit value (or the resolved value once the schema is built)
    Value(Value),
    /// Resolved from the enclosing record's default tree by dotted path
    Inherit,
}

/// Closed set of field kinds
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array {
        /// Element definition (boxed to allow recursive types)
        elements: Box<FieldDef>,
    },
    Record {
        /// Nested field definitions, in declaration order
        fields: Vec<FieldDef>,
        /// Inherited defaults for descendants
        defaults: Option<DefaultTree>,
    },
    Foreign {
        /// Referenced entity name
        reference: String,
    },
}

impl FieldKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array { .. } => "array",
            FieldKind::Record { .. } => "record",
            FieldKind::Foreign { .. } => "foreign",
        }
    }
}

/// One field's kind, constraints, default and hooks
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: DefaultSpec,
    pub constraints: Constraints,
    pub custom_validator: Option<CustomValidator>,
    pub normalizer: Option<Normalizer>,
    /// Set when a default tree was attached to a non-record field
    pub(crate) stray_tree: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: DefaultSpec::None,
            constraints: Constraints::default(),
            custom_validator: None,
            normalizer: None,
            stray_tree: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn array(name: impl Into<String>, elements: FieldDef) -> Self {
        Self::new(
            name,
            FieldKind::Array {
                elements: Box::new(elements),
            },
        )
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::new(
            name,
            FieldKind::Record {
                fields,
                defaults: None,
            },
        )
    }

    pub fn foreign(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Foreign {
                reference: reference.into(),
            },
        )
    }

    /// Unnamed definition used as an array element
    pub fn element(kind: FieldKind) -> Self {
        Self::new("", kind)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultSpec::Value(value.into());
        self
    }

    /// Take this field's default from the nearest enclosing default tree
    pub fn inherit_default(mut self) -> Self {
        self.default = DefaultSpec::Inherit;
        self
    }

    /// Drop any default carried over from a defined type
    pub fn no_default(mut self) -> Self {
        self.default = DefaultSpec::None;
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn between(mut self, lo: f64, hi: f64) -> Self {
        self.constraints = self.constraints.between(lo, hi);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints = self.constraints.one_of(values);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> SchemaResult<Self> {
        self.constraints = self.constraints.pattern(pattern)?;
        Ok(self)
    }

    pub fn len_min(mut self, len: usize) -> Self {
        self.constraints = self.constraints.len_min(len);
        self
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.constraints = self.constraints.starts_with(prefix);
        self
    }

    pub fn custom(mut self, validator: CustomValidator) -> Self {
        self.custom_validator = Some(validator);
        self
    }

    pub fn normalize(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Attach a default tree to a record field. On any other kind the
    /// schema fails to build.
    pub fn default_tree(mut self, tree: DefaultTree) -> Self {
        match self.kind {
            FieldKind::Record { ref mut defaults, .. } => *defaults = Some(tree),
            _ => self.stray_tree = true,
        }
        self
    }

    /// Returns the resolved default, if any
    pub fn resolved_default(&self) -> Option<&Value> {
        match &self.default {
            DefaultSpec::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Nested fields of a record, or `None` for other kinds
    pub fn nested_fields(&self) -> Option<&[FieldDef]> {
        match &self.kind {
            FieldKind::Record { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, FieldKind::Record { .. })
    }
}

/// Condition applied to one side of a conditional entity check
#[derive(Debug, Clone, Default)]
pub struct Match {
    /// Field must be present
    pub required: bool,
    pub constraints: Constraints,
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            constraints: Constraints::default(),
        }
    }

    pub fn pattern(pattern: &str) -> SchemaResult<Self> {
        Ok(Self {
            required: false,
            constraints: Constraints::new().pattern(pattern)?,
        })
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            required: false,
            constraints: Constraints::new().one_of(values),
        }
    }

    pub fn between(lo: f64, hi: f64) -> Self {
        Self {
            required: false,
            constraints: Constraints::new().between(lo, hi),
        }
    }
}

/// "When `if_field` matches `if_match`, `then_field` must satisfy `then_match`"
#[derive(Debug, Clone)]
pub struct Conditional {
    pub if_field: String,
    pub if_match: Match,
    pub then_field: String,
    pub then_match: Match,
}

/// Cross-field rule evaluated after per-field validation
#[derive(Debug, Clone)]
pub enum EntityCheck {
    Conditional(Conditional),
    /// Present values of these fields must be pairwise different
    Distinct(Vec<String>),
}

impl EntityCheck {
    pub fn conditional(
        if_field: impl Into<String>,
        if_match: Match,
        then_field: impl Into<String>,
        then_match: Match,
    ) -> Self {
        EntityCheck::Conditional(Conditional {
            if_field: if_field.into(),
            if_match,
            then_field: then_field.into(),
            then_match,
        })
    }

    pub fn distinct<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EntityCheck::Distinct(fields.into_iter().map(Into::into).collect())
    }

    /// Field paths this check reads
    pub fn fields(&self) -> Vec<&str> {
        match self {
            EntityCheck::Conditional(c) => vec![c.if_field.as_str(), c.then_field.as_str()],
            EntityCheck::Distinct(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

/// Complete, immutable declaration of one entity type
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    primary_key: Vec<String>,
    fields: Vec<FieldDef>,
    checks: Vec<EntityCheck>,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            name: name.into(),
            primary_key: Vec::new(),
            fields: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn checks(&self) -> &[EntityCheck] {
        &self.checks
    }

    /// Top-level field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field by dotted path (e.g., "healthchecks.active.timeout")
    pub fn lookup(&self, path: &str) -> Option<&FieldDef> {
        lookup_path(&self.fields, path)
    }

    /// Canonical default document: every field with a resolved default
    pub fn default_document(&self) -> Value {
        let mut doc = Map::new();
        for field in &self.fields {
            if let Some(v) = field.resolved_default() {
                doc.insert(field.name.clone(), v.clone());
            }
        }
        Value::Object(doc)
    }
}

pub(crate) fn lookup_path<'a>(fields: &'a [FieldDef], path: &str) -> Option<&'a FieldDef> {
    let mut current = fields;
    let mut found = None;
    for segment in path.split('.') {
        let field = current.iter().find(|f| f.name == segment)?;
        current = field.nested_fields().unwrap_or(&[]);
        found = Some(field);
    }
    found
}

/// Builder for `EntitySchema`; `build` performs all construction-time checks
pub struct EntitySchemaBuilder {
    name: String,
    primary_key: Vec<String>,
    fields: Vec<FieldDef>,
    checks: Vec<EntityCheck>,
}

impl EntitySchemaBuilder {
    pub fn primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn check(mut self, check: EntityCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Validates the declaration and resolves every default.
    ///
    /// # Errors
    ///
    /// Any `SchemaError`; all of them are construction failures.
    pub fn build(self) -> SchemaResult<EntitySchema> {
        let EntitySchemaBuilder {
            name,
            primary_key,
            mut fields,
            checks,
        } = self;

        check_fields(&name, &fields, "")?;

        for key in &primary_key {
            if lookup_path(&fields, key).is_none() {
                return Err(SchemaError::UnknownPrimaryKey {
                    schema: name.clone(),
                    field: key.clone(),
                });
            }
        }

        for check in &checks {
            for field in check.fields() {
                if lookup_path(&fields, field).is_none() {
                    return Err(SchemaError::UnknownCheckField {
                        schema: name.clone(),
                        field: field.to_string(),
                    });
                }
            }
        }

        defaults::merge_defaults(&name, &mut fields)?;

        Ok(EntitySchema {
            name,
            primary_key,
            fields,
            checks,
        })
    }
}

/// Rejects duplicate names and misplaced default trees, descending into
/// records and array elements.
fn check_fields(schema: &str, fields: &[FieldDef], prefix: &str) -> SchemaResult<()> {
    for (i, field) in fields.iter().enumerate() {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(SchemaError::DuplicateField {
                schema: schema.to_string(),
                field: path,
            });
        }
        check_nested(schema, field, &path)?;
    }
    Ok(())
}

fn check_nested(schema: &str, field: &FieldDef, path: &str) -> SchemaResult<()> {
    if field.stray_tree {
        return Err(SchemaError::MisplacedDefaultTree {
            schema: schema.to_string(),
            field: path.to_string(),
        });
    }
    match field.kind {
        FieldKind::Record { ref fields, .. } => check_fields(schema, fields, path),
        FieldKind::Array { ref elements } => {
            check_nested(schema, elements, &defaults::element_path(path))
        }
        _ => Ok(()),
    }
}
