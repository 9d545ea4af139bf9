//! Conditional constraint evaluator
//!
//! Entity checks are an unordered set of post-conditions on the validated
//! document. Every check reads the same snapshot; none can observe another's
//! outcome, and checks sharing a `then_field` are all evaluated.
//!
//! A check that reads a field which already failed per-field validation is
//! skipped: its inputs are not trustworthy.

use serde_json::Value;

use super::checkers;
use super::errors::{ValidationError, ValidationErrors};
use super::types::{Conditional, EntityCheck};

/// Evaluates all checks against `document`, returning every violation in
/// declaration order.
pub fn evaluate(checks: &[EntityCheck], document: &Value, prior: &ValidationErrors) -> Vec<ValidationError> {
    let mut violations = Vec::new();

    for check in checks {
        if check.fields().iter().any(|f| has_failed(prior, f)) {
            continue;
        }
        match check {
            EntityCheck::Conditional(c) => {
                if let Some(error) = evaluate_conditional(c, document) {
                    violations.push(error);
                }
            }
            EntityCheck::Distinct(fields) => evaluate_distinct(fields, document, &mut violations),
        }
    }

    violations
}

fn evaluate_conditional(check: &Conditional, document: &Value) -> Option<ValidationError> {
    let trigger = resolve_path(document, &check.if_field)?;
    if checkers::check_match(trigger, &check.if_match).is_err() {
        return None;
    }

    match resolve_path(document, &check.then_field) {
        None if check.then_match.required => Some(ValidationError::conditional(
            &check.then_field,
            &check.if_field,
            "required field missing",
            None,
        )),
        None => None,
        Some(value) => checkers::check_match(value, &check.then_match)
            .err()
            .map(|rule| ValidationError::conditional(&check.then_field, &check.if_field, rule, Some(value))),
    }
}

fn evaluate_distinct(fields: &[String], document: &Value, violations: &mut Vec<ValidationError>) {
    let present: Vec<(&String, &Value)> = fields
        .iter()
        .filter_map(|f| resolve_path(document, f).map(|v| (f, v)))
        .collect();

    for (i, (field, value)) in present.iter().enumerate() {
        if let Some((other, _)) = present[..i].iter().find(|(_, v)| v == value) {
            violations.push(ValidationError::distinct(field.as_str(), other.as_str(), value));
        }
    }
}

/// Resolves a dotted path in a document; `null` counts as absent.
pub fn resolve_path<'d>(document: &'d Value, path: &str) -> Option<&'d Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// A field has failed if an error is attributed to it, to one of its
/// descendants, or to one of its ancestors.
fn has_failed(prior: &ValidationErrors, field: &str) -> bool {
    prior.iter().any(|e| {
        e.field == field
            || is_descendant(&e.field, field)
            || is_descendant(field, &e.field)
    })
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .map_or(false, |rest| rest.starts_with('.') || rest.starts_with('['))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::ErrorKind;
    use crate::schema::types::Match;
    use serde_json::json;

    fn header_check() -> EntityCheck {
        EntityCheck::conditional(
            "hash_on",
            Match::pattern("^header$").unwrap(),
            "hash_on_header",
            Match::required(),
        )
    }

    fn none_check() -> EntityCheck {
        EntityCheck::conditional(
            "hash_on",
            Match::pattern("^none$").unwrap(),
            "hash_fallback",
            Match::one_of(["none"]),
        )
    }

    #[test]
    fn test_untriggered_check_passes() {
        let doc = json!({ "hash_on": "ip" });
        assert!(evaluate(&[header_check()], &doc, &ValidationErrors::new()).is_empty());
    }

    #[test]
    fn test_absent_trigger_does_not_fire() {
        let doc = json!({});
        assert!(evaluate(&[header_check()], &doc, &ValidationErrors::new()).is_empty());
    }

    #[test]
    fn test_required_dependent_missing() {
        let doc = json!({ "hash_on": "header" });
        let violations = evaluate(&[header_check()], &doc, &ValidationErrors::new());
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.field, "hash_on_header");
        assert_eq!(v.kind, ErrorKind::ConditionalViolation);
        assert_eq!(v.trigger.as_deref(), Some("hash_on"));
    }

    #[test]
    fn test_dependent_fails_rule() {
        let doc = json!({ "hash_on": "none", "hash_fallback": "consumer" });
        let violations = evaluate(&[none_check()], &doc, &ValidationErrors::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "hash_fallback");
        assert_eq!(violations[0].actual, Some(json!("consumer")));
        assert!(violations[0].message.contains("expected one of: none"));
    }

    #[test]
    fn test_checks_on_same_field_all_evaluated() {
        let other = EntityCheck::conditional(
            "hash_on",
            Match::one_of(["none"]),
            "hash_fallback",
            Match::pattern("^none$").unwrap(),
        );
        let doc = json!({ "hash_on": "none", "hash_fallback": "ip" });
        let violations = evaluate(&[none_check(), other], &doc, &ValidationErrors::new());
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_check_order_is_irrelevant() {
        let doc = json!({ "hash_on": "header", "hash_fallback": "ip" });
        let a = evaluate(&[header_check(), none_check()], &doc, &ValidationErrors::new());
        let b = evaluate(&[none_check(), header_check()], &doc, &ValidationErrors::new());
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_paths() {
        let check = EntityCheck::conditional(
            "active.type",
            Match::one_of(["https"]),
            "active.https_sni",
            Match::required(),
        );
        let doc = json!({ "active": { "type": "https" } });
        let violations = evaluate(&[check], &doc, &ValidationErrors::new());
        assert_eq!(violations[0].field, "active.https_sni");
    }

    #[test]
    fn test_numeric_trigger() {
        let check = EntityCheck::conditional("slots", Match::between(10.0, 100.0), "name", Match::required());
        let violations = evaluate(&[check.clone()], &json!({ "slots": 50 }), &ValidationErrors::new());
        assert_eq!(violations.len(), 1);
        assert!(evaluate(&[check], &json!({ "slots": 500 }), &ValidationErrors::new()).is_empty());
    }

    #[test]
    fn test_distinct() {
        let check = EntityCheck::distinct(["hash_on_header", "hash_fallback_header"]);
        let doc = json!({ "hash_on_header": "X-A", "hash_fallback_header": "X-A" });
        let violations = evaluate(&[check.clone()], &doc, &ValidationErrors::new());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "hash_fallback_header");
        assert_eq!(violations[0].kind, ErrorKind::DistinctViolation);

        let doc = json!({ "hash_on_header": "X-A" });
        assert!(evaluate(&[check], &doc, &ValidationErrors::new()).is_empty());
    }

    #[test]
    fn test_failed_fields_skip_checks() {
        let prior = ValidationErrors::from(vec![ValidationError::missing_field("hash_on")]);
        let doc = json!({});
        assert!(evaluate(&[header_check()], &doc, &prior).is_empty());

        let prior = ValidationErrors::from(vec![ValidationError::missing_field("active.type")]);
        let check = EntityCheck::conditional("active", Match::new(), "name", Match::required());
        assert!(evaluate(&[check], &json!({ "active": {} }), &prior).is_empty());
    }

    #[test]
    fn test_resolve_path() {
        let doc = json!({ "a": { "b": { "c": 1 }, "n": null } });
        assert_eq!(resolve_path(&doc, "a.b.c"), Some(&json!(1)));
        assert_eq!(resolve_path(&doc, "a.n"), None);
        assert_eq!(resolve_path(&doc, "a.b.c.d"), None);
        assert_eq!(resolve_path(&doc, "x"), None);
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("a.b", "a"));
        assert!(is_descendant("tags[0]", "tags"));
        assert!(!is_descendant("ab", "a"));
        assert!(!is_descendant("a", "a"));
    }
}
