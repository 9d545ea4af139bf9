//! Schema Invariant Tests
//!
//! Properties every entity schema must hold:
//! - Resolved defaults satisfy their own field constraints
//! - Validation is deterministic and idempotent
//! - Missing required fields are named
//! - Triggered conditionals name both fields
//! - Broken declarations never produce a schema

use balancer_schema::schema::{
    validate, validate_all, DefaultTree, EntityCheck, EntitySchema, ErrorKind, FieldDef, FieldKind,
    Match, SchemaError, TypeRegistry,
};
use balancer_schema::Catalog;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn catalog() -> Catalog {
    Catalog::builtin().unwrap()
}

/// Visits every field (records recursively) with its dotted path.
fn walk<'a>(fields: &'a [FieldDef], prefix: &str, out: &mut Vec<(String, &'a FieldDef)>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        if let Some(nested) = field.nested_fields() {
            walk(nested, &path, out);
        }
        out.push((path, field));
    }
}

fn sample_documents() -> Vec<(&'static str, Value)> {
    vec![
        ("upstreams", json!({ "name": "api.internal" })),
        (
            "upstreams",
            json!({
                "name": "api.internal",
                "hash_on": "header",
                "hash_on_header": "X-Tenant",
                "hash_fallback": "cookie",
                "hash_on_cookie": "sid",
                "tags": ["edge", "eu"],
                "healthchecks": { "passive": { "unhealthy": { "timeouts": 4 } } },
            }),
        ),
        (
            "targets",
            json!({ "upstream": "0b9e8f71-4d2a-4c3b-8e5f-6a7b8c9d0e1f", "target": "10.0.0.9" }),
        ),
        (
            "targets",
            json!({ "upstream": { "id": "0b9e8f71-4d2a-4c3b-8e5f-6a7b8c9d0e1f" }, "target": "::1", "weight": 0 }),
        ),
    ]
}

// =============================================================================
// Default Consistency
// =============================================================================

/// Each resolved default passes validation as the only value of its field.
#[test]
fn test_every_default_satisfies_its_constraints() {
    let catalog = catalog();
    for schema in catalog.schemas() {
        let mut fields = Vec::new();
        walk(schema.fields(), "", &mut fields);

        for (path, field) in fields {
            let Some(default) = field.resolved_default() else {
                continue;
            };
            let single = EntitySchema::builder("single").field(field.clone()).build().unwrap();
            let mut doc = serde_json::Map::new();
            doc.insert(field.name.clone(), default.clone());
            let result = validate_all(&single, &Value::Object(doc));
            assert!(
                result.is_ok(),
                "{}.{} default {} rejected: {:?}",
                schema.name(),
                path,
                default,
                result
            );
        }
    }
}

/// Default documents are owned per schema; separate builds never alias.
#[test]
fn test_default_documents_are_independent() {
    let a = catalog();
    let b = catalog();
    let mut doc = a.get("upstreams").unwrap().default_document();
    doc["healthchecks"]["active"]["timeout"] = json!(99);
    assert_eq!(
        b.get("upstreams").unwrap().default_document()["healthchecks"]["active"]["timeout"],
        json!(1)
    );
    assert_eq!(
        a.get("upstreams").unwrap().default_document()["healthchecks"]["active"]["timeout"],
        json!(1)
    );
}

// =============================================================================
// Determinism and Idempotence
// =============================================================================

#[test]
fn test_validation_is_deterministic() {
    let catalog = catalog();
    for (entity, doc) in sample_documents() {
        let schema = catalog.get(entity).unwrap();
        let first = validate(schema, &doc).unwrap();
        for _ in 0..50 {
            assert_eq!(validate(schema, &doc).unwrap(), first);
        }
    }
}

#[test]
fn test_validation_is_idempotent() {
    let catalog = catalog();
    for (entity, doc) in sample_documents() {
        let schema = catalog.get(entity).unwrap();
        let once = validate(schema, &doc).unwrap();
        let twice = validate(schema, &once).unwrap();
        assert_eq!(once, twice, "{} not idempotent for {}", entity, doc);
    }
}

#[test]
fn test_validation_does_not_mutate_input() {
    let catalog = catalog();
    let doc = json!({ "upstream": "0b9e8f71-4d2a-4c3b-8e5f-6a7b8c9d0e1f", "target": "svc.local" });
    let before = doc.clone();
    validate(catalog.get("targets").unwrap(), &doc).unwrap();
    assert_eq!(doc, before);
}

#[test]
fn test_invalid_document_fails_consistently() {
    let catalog = catalog();
    let schema = catalog.get("upstreams").unwrap();
    let doc = json!({ "name": "a", "slots": 1 });
    let first = validate_all(schema, &doc).unwrap_err();
    for _ in 0..50 {
        assert_eq!(validate_all(schema, &doc).unwrap_err(), first);
    }
}

// =============================================================================
// Required Fields
// =============================================================================

#[test]
fn test_missing_required_field_is_named() {
    let catalog = catalog();
    let errors = validate(catalog.get("upstreams").unwrap(), &json!({})).unwrap_err();
    assert_eq!(errors.len(), 1);
    let err = errors.first().unwrap();
    assert_eq!(err.field, "name");
    assert_eq!(err.kind, ErrorKind::MissingField);
}

#[test]
fn test_null_counts_as_absent() {
    let catalog = catalog();
    let schema = catalog.get("targets").unwrap();

    let errors = validate(schema, &json!({ "upstream": null, "target": "a.local" })).unwrap_err();
    assert!(errors.has("upstream", ErrorKind::MissingField));

    let out = validate(
        schema,
        &json!({ "upstream": "0b9e8f71-4d2a-4c3b-8e5f-6a7b8c9d0e1f", "target": "a.local", "weight": null }),
    )
    .unwrap();
    assert_eq!(out["weight"], json!(100));
}

#[test]
fn test_undeclared_field_rejected() {
    let catalog = catalog();
    let errors = validate(
        catalog.get("upstreams").unwrap(),
        &json!({ "name": "a", "algorithm": "round-robin" }),
    )
    .unwrap_err();
    assert!(errors.has("algorithm", ErrorKind::UnknownField));
}

#[test]
fn test_non_record_root_rejected() {
    let catalog = catalog();
    let errors = validate(catalog.get("targets").unwrap(), &json!(["a"])).unwrap_err();
    assert_eq!(errors.first().unwrap().kind, ErrorKind::TypeMismatch);
}

// =============================================================================
// Conditional Checks
// =============================================================================

#[test]
fn test_conditional_names_both_fields() {
    let catalog = catalog();
    let errors = validate(
        catalog.get("upstreams").unwrap(),
        &json!({ "name": "a", "hash_fallback": "header" }),
    )
    .unwrap_err();
    let err = errors.first().unwrap();
    assert_eq!(err.kind, ErrorKind::ConditionalViolation);
    assert_eq!(err.field, "hash_fallback_header");
    assert_eq!(err.trigger.as_deref(), Some("hash_fallback"));
    assert!(err.message.contains("hash_fallback"));
}

#[test]
fn test_checks_skip_fields_that_already_failed() {
    let catalog = catalog();
    let errors = validate_all(
        catalog.get("upstreams").unwrap(),
        &json!({ "name": "a", "hash_on": "sticky" }),
    )
    .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.has("hash_on", ErrorKind::TypeMismatch));
}

#[test]
fn test_collect_mode_reports_independent_errors() {
    let catalog = catalog();
    let errors = validate_all(
        catalog.get("targets").unwrap(),
        &json!({ "target": "bad host", "weight": -1, "tags": ["", "ok"] }),
    )
    .unwrap_err();
    assert!(errors.has("upstream", ErrorKind::MissingField));
    assert!(errors.has("target", ErrorKind::CustomValidation));
    assert!(errors.has("weight", ErrorKind::TypeMismatch));
    assert!(errors.has("tags[0]", ErrorKind::TypeMismatch));
    assert_eq!(errors.len(), 4);

    let errors = validate(
        catalog.get("targets").unwrap(),
        &json!({ "target": "bad host", "weight": -1 }),
    )
    .unwrap_err();
    assert_eq!(errors.len(), 1);
}

// =============================================================================
// Construction Failures
// =============================================================================

#[test]
fn test_unresolved_default_path_fails_construction() {
    let tree = DefaultTree::new(json!({ "active": { "timeout": 1 } })).unwrap();
    let result = EntitySchema::builder("broken")
        .field(
            FieldDef::record(
                "healthchecks",
                vec![
                    FieldDef::record("active", vec![FieldDef::number("timeout").inherit_default()]),
                    FieldDef::record("passive", vec![FieldDef::number("timeout").inherit_default()]),
                ],
            )
            .default_tree(tree),
        )
        .build();
    match result {
        Err(SchemaError::UnresolvedDefault { path, .. }) => assert_eq!(path, "passive.timeout"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_default_violating_constraints_fails_construction() {
    let result = EntitySchema::builder("broken")
        .field(FieldDef::integer("weight").default(5000).between(0.0, 1000.0))
        .build();
    let err = result.unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_unknown_defined_type_fails() {
    let registry = TypeRegistry::builtin().unwrap();
    assert_eq!(
        registry.field("duration", "timeout").unwrap_err(),
        SchemaError::UnknownType("duration".into())
    );
}

#[test]
fn test_check_on_undeclared_field_fails() {
    let result = EntitySchema::builder("broken")
        .field(FieldDef::string("hash_on"))
        .check(EntityCheck::conditional(
            "hash_on",
            Match::one_of(["header"]),
            "hash_on_header",
            Match::required(),
        ))
        .build();
    assert!(matches!(result, Err(SchemaError::UnknownCheckField { .. })));
}

#[test]
fn test_array_of_records() {
    let schema = EntitySchema::builder("routes")
        .field(FieldDef::array(
            "destinations",
            FieldDef::element(FieldKind::Record {
                fields: vec![
                    FieldDef::string("ip").required(),
                    FieldDef::integer("port").default(80),
                ],
                defaults: None,
            }),
        ))
        .build()
        .unwrap();

    let out = validate(&schema, &json!({ "destinations": [{ "ip": "10.0.0.1" }] })).unwrap();
    assert_eq!(out["destinations"][0]["port"], json!(80));

    let errors = validate(&schema, &json!({ "destinations": [{ "port": 81 }] })).unwrap_err();
    assert!(errors.has("destinations[0].ip", ErrorKind::MissingField));
}
