//! Default merger
//!
//! Resolves every field default once, while the schema is being built:
//! - Inline defaults are kept as declared
//! - Inheriting leaves read their value from the nearest enclosing default
//!   tree, addressed by the dotted path relative to that tree's record
//! - A record's default is the document built from its children's defaults,
//!   with any inline record default merged over it
//!
//! An unresolvable path aborts construction. Every resolved default is then
//! validated against its own field definition and stored in canonical form.

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{DefaultSpec, FieldDef, FieldKind};
use super::validator;

/// Document-shaped tree of inherited defaults
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultTree {
    root: Map<String, Value>,
}

impl DefaultTree {
    /// Wraps a document literal. The root must be an object.
    pub fn new(value: Value) -> SchemaResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(SchemaError::MalformedDefaultTree {
                found: json_type_name(&other).to_string(),
            }),
        }
    }

    /// Resolves a dotted path. On failure returns the first missing segment.
    pub fn resolve(&self, path: &str) -> Result<&Value, String> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.root.get(first).ok_or_else(|| first.to_string())?;
        for segment in segments {
            current = current
                .as_object()
                .and_then(|obj| obj.get(segment))
                .ok_or_else(|| segment.to_string())?;
        }
        Ok(current)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

/// Default tree in effect for a record's children, with the children's path
/// prefix relative to the tree root.
#[derive(Clone)]
struct TreeScope<'t> {
    tree: &'t DefaultTree,
    prefix: String,
}

impl<'t> TreeScope<'t> {
    fn path_of(&self, name: &str) -> String {
        join(&self.prefix, name)
    }

    fn child(&self, name: &str) -> Self {
        Self {
            tree: self.tree,
            prefix: self.path_of(name),
        }
    }
}

/// Resolves and verifies the defaults of every field in a schema.
pub(crate) fn merge_defaults(schema: &str, fields: &mut [FieldDef]) -> SchemaResult<()> {
    for field in fields.iter_mut() {
        resolve_field(schema, field, "", None)?;
    }
    for field in fields.iter_mut() {
        verify_default(schema, field, "")?;
    }
    Ok(())
}

fn resolve_field(
    schema: &str,
    field: &mut FieldDef,
    prefix: &str,
    scope: Option<&TreeScope<'_>>,
) -> SchemaResult<()> {
    let path = join(prefix, &field.name);
    let inner = scope.map(|s| s.child(&field.name));
    resolve_at(schema, field, &path, scope, inner.as_ref())
}

/// `scope` resolves the field's own inherited default; `inner` is the scope
/// its nested fields see unless it declares a tree of its own. Array
/// elements share the array's scopes.
fn resolve_at(
    schema: &str,
    field: &mut FieldDef,
    path: &str,
    scope: Option<&TreeScope<'_>>,
    inner: Option<&TreeScope<'_>>,
) -> SchemaResult<()> {
    match field.kind {
        FieldKind::Record {
            ref mut fields,
            ref defaults,
        } => {
            // Value semantics: each record owns a copy of the tree it resolves against
            let own_tree = defaults.clone();
            let child_scope = match own_tree {
                Some(ref tree) => Some(TreeScope {
                    tree,
                    prefix: String::new(),
                }),
                None => inner.cloned(),
            };

            let mut built = Map::new();
            let mut complete = true;
            for child in fields.iter_mut() {
                resolve_field(schema, child, path, child_scope.as_ref())?;
                match child.resolved_default() {
                    Some(v) => {
                        built.insert(child.name.clone(), v.clone());
                    }
                    None if child.required => complete = false,
                    None => {}
                }
            }

            field.default = match std::mem::replace(&mut field.default, DefaultSpec::None) {
                DefaultSpec::Value(explicit) => {
                    let mut base = Value::Object(built);
                    merge_into(&mut base, explicit);
                    DefaultSpec::Value(base)
                }
                _ if complete && !built.is_empty() => DefaultSpec::Value(Value::Object(built)),
                _ => DefaultSpec::None,
            };
            return Ok(());
        }
        FieldKind::Array { ref mut elements } => {
            resolve_at(schema, elements, &element_path(path), inner, inner)?;
        }
        _ => {}
    }

    if field.default == DefaultSpec::Inherit {
        let scope = scope.ok_or_else(|| SchemaError::NoDefaultTree {
            schema: schema.to_string(),
            path: path.to_string(),
        })?;
        let tree_path = if field.name.is_empty() {
            scope.prefix.clone()
        } else {
            scope.path_of(&field.name)
        };
        let value = scope
            .tree
            .resolve(&tree_path)
            .map_err(|segment| SchemaError::UnresolvedDefault {
                schema: schema.to_string(),
                path: tree_path.clone(),
                segment,
            })?;
        field.default = DefaultSpec::Value(value.clone());
    }

    Ok(())
}

/// Validates each resolved default against its own definition and stores the
/// canonical form, so validating an absent field and validating the default
/// explicitly produce the same document.
fn verify_default(schema: &str, field: &mut FieldDef, prefix: &str) -> SchemaResult<()> {
    let path = join(prefix, &field.name);
    verify_at(schema, field, &path)
}

fn verify_at(schema: &str, field: &mut FieldDef, path: &str) -> SchemaResult<()> {
    match field.kind {
        FieldKind::Record { ref mut fields, .. } => {
            for child in fields.iter_mut() {
                verify_default(schema, child, path)?;
            }
        }
        FieldKind::Array { ref mut elements } => verify_at(schema, elements, &element_path(path))?,
        _ => {}
    }

    if let DefaultSpec::Value(ref value) = field.default {
        let canonical = validator::check_value(field, value, path).map_err(|errors| {
            SchemaError::InvalidDefault {
                schema: schema.to_string(),
                path: path.to_string(),
                reason: errors
                    .first()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .unwrap_or_default(),
            }
        })?;
        field.default = DefaultSpec::Value(canonical);
    }

    Ok(())
}

/// Path of an array's element definition ("tags[]")
pub(crate) fn element_path(path: &str) -> String {
    format!("{}[]", path)
}

/// Deep merge: objects merge key by key, anything else in `overlay` wins.
pub(crate) fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::EntitySchema;
    use serde_json::json;

    fn check_tree() -> DefaultTree {
        DefaultTree::new(json!({
            "active": {
                "timeout": 1,
                "healthy": { "interval": 0, "successes": 0 },
            },
            "passive": {
                "unhealthy": { "timeouts": 0 },
            },
        }))
        .unwrap()
    }

    fn checks_record() -> FieldDef {
        FieldDef::record(
            "checks",
            vec![
                FieldDef::record(
                    "active",
                    vec![
                        FieldDef::number("timeout").inherit_default(),
                        FieldDef::record(
                            "healthy",
                            vec![
                                FieldDef::number("interval").inherit_default(),
                                FieldDef::integer("successes").inherit_default(),
                            ],
                        ),
                    ],
                ),
                FieldDef::record(
                    "passive",
                    vec![FieldDef::record(
                        "unhealthy",
                        vec![FieldDef::integer("timeouts").inherit_default()],
                    )],
                ),
            ],
        )
        .default_tree(check_tree())
    }

    #[test]
    fn test_tree_resolves_dotted_path() {
        let tree = check_tree();
        assert_eq!(tree.resolve("passive.unhealthy.timeouts").unwrap(), &json!(0));
        assert_eq!(tree.resolve("active.timeout").unwrap(), &json!(1));
    }

    #[test]
    fn test_tree_reports_missing_segment() {
        let tree = check_tree();
        assert_eq!(tree.resolve("passive.healthy.successes").unwrap_err(), "healthy");
        assert_eq!(tree.resolve("nope").unwrap_err(), "nope");
        assert_eq!(tree.resolve("active.timeout.deeper").unwrap_err(), "deeper");
    }

    #[test]
    fn test_tree_root_must_be_object() {
        assert!(matches!(
            DefaultTree::new(json!([1, 2])),
            Err(SchemaError::MalformedDefaultTree { .. })
        ));
    }

    #[test]
    fn test_nested_defaults_built_eagerly() {
        let schema = EntitySchema::builder("monitors")
            .field(checks_record())
            .build()
            .unwrap();
        assert_eq!(
            schema.default_document(),
            json!({
                "checks": {
                    "active": { "timeout": 1, "healthy": { "interval": 0, "successes": 0 } },
                    "passive": { "unhealthy": { "timeouts": 0 } },
                }
            })
        );
        let leaf = schema.lookup("checks.active.healthy.interval").unwrap();
        assert_eq!(leaf.resolved_default(), Some(&json!(0)));
    }

    #[test]
    fn test_missing_tree_path_aborts_construction() {
        let record = FieldDef::record(
            "checks",
            vec![FieldDef::record(
                "passive",
                vec![FieldDef::integer("http_failures").inherit_default()],
            )],
        )
        .default_tree(check_tree());

        let result = EntitySchema::builder("monitors").field(record).build();
        match result {
            Err(SchemaError::UnresolvedDefault { path, segment, .. }) => {
                assert_eq!(path, "passive.http_failures");
                assert_eq!(segment, "http_failures");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_inherit_without_tree_aborts_construction() {
        let result = EntitySchema::builder("monitors")
            .field(FieldDef::integer("slots").inherit_default())
            .build();
        assert!(matches!(result, Err(SchemaError::NoDefaultTree { .. })));
    }

    #[test]
    fn test_default_must_satisfy_constraints() {
        let result = EntitySchema::builder("targets")
            .field(FieldDef::integer("weight").default(5000).between(0.0, 1000.0))
            .build();
        match result {
            Err(SchemaError::InvalidDefault { path, reason, .. }) => {
                assert_eq!(path, "weight");
                assert!(reason.contains("between 0 and 1000"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_inherited_default_must_satisfy_constraints() {
        let record = FieldDef::record(
            "checks",
            vec![FieldDef::integer("concurrency").inherit_default().between(1.0, 100.0)],
        )
        .default_tree(DefaultTree::new(json!({ "concurrency": 0 })).unwrap());
        let result = EntitySchema::builder("monitors").field(record).build();
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_element_default_must_satisfy_constraints() {
        let result = EntitySchema::builder("monitors")
            .field(FieldDef::array(
                "windows",
                FieldDef::element(FieldKind::Record {
                    fields: vec![FieldDef::integer("n").default(5000).between(0.0, 10.0)],
                    defaults: None,
                }),
            ))
            .build();
        match result {
            Err(SchemaError::InvalidDefault { path, .. }) => assert_eq!(path, "windows[].n"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_element_inherits_from_enclosing_tree() {
        let record = FieldDef::record(
            "checks",
            vec![FieldDef::array(
                "windows",
                FieldDef::element(FieldKind::Record {
                    fields: vec![FieldDef::integer("size").inherit_default()],
                    defaults: None,
                }),
            )],
        )
        .default_tree(DefaultTree::new(json!({ "windows": { "size": 3 } })).unwrap());
        let schema = EntitySchema::builder("monitors").field(record).build().unwrap();
        let windows = schema.lookup("checks.windows").unwrap();
        let FieldKind::Array { ref elements } = windows.kind else {
            panic!("expected an array");
        };
        assert_eq!(
            elements.nested_fields().unwrap()[0].resolved_default(),
            Some(&json!(3))
        );
    }

    #[test]
    fn test_element_missing_tree_path_aborts_construction() {
        let record = FieldDef::record(
            "checks",
            vec![FieldDef::array(
                "windows",
                FieldDef::element(FieldKind::Record {
                    fields: vec![FieldDef::integer("size").inherit_default()],
                    defaults: None,
                }),
            )],
        )
        .default_tree(DefaultTree::new(json!({ "other": 1 })).unwrap());
        let result = EntitySchema::builder("monitors").field(record).build();
        match result {
            Err(SchemaError::UnresolvedDefault { path, segment, .. }) => {
                assert_eq!(path, "windows.size");
                assert_eq!(segment, "windows");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_element_inherit_without_tree_aborts_construction() {
        let result = EntitySchema::builder("monitors")
            .field(FieldDef::array(
                "windows",
                FieldDef::element(FieldKind::Record {
                    fields: vec![FieldDef::integer("size").inherit_default()],
                    defaults: None,
                }),
            ))
            .build();
        match result {
            Err(SchemaError::NoDefaultTree { path, .. }) => assert_eq!(path, "windows[].size"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_inline_record_default_merges_over_children() {
        let record = FieldDef::record(
            "limits",
            vec![FieldDef::integer("min").default(1), FieldDef::integer("max").default(10)],
        )
        .default(json!({ "max": 20 }));
        let schema = EntitySchema::builder("x").field(record).build().unwrap();
        assert_eq!(
            schema.default_document(),
            json!({ "limits": { "min": 1, "max": 20 } })
        );
    }

    #[test]
    fn test_record_with_required_child_has_no_default() {
        let record = FieldDef::record(
            "owner",
            vec![FieldDef::string("name").required(), FieldDef::integer("age").default(1)],
        );
        let schema = EntitySchema::builder("x").field(record).build().unwrap();
        assert_eq!(schema.default_document(), json!({}));
    }

    #[test]
    fn test_defaults_do_not_alias_between_schemas() {
        let a = EntitySchema::builder("a").field(checks_record()).build().unwrap();
        let b = EntitySchema::builder("b").field(checks_record()).build().unwrap();
        let mut doc = a.default_document();
        doc["checks"]["active"]["timeout"] = json!(99);
        assert_eq!(b.default_document()["checks"]["active"]["timeout"], json!(1));
        assert_eq!(a.default_document()["checks"]["active"]["timeout"], json!(1));
    }

    #[test]
    fn test_merge_into_is_deep() {
        let mut base = json!({ "a": { "b": 1, "c": 2 }, "d": [1] });
        merge_into(&mut base, json!({ "a": { "c": 3 }, "d": [2, 3] }));
        assert_eq!(base, json!({ "a": { "b": 1, "c": 3 }, "d": [2, 3] }));
    }
}
