//! Primitive type checkers
//!
//! Scalar conformance and refinements. Containers (arrays, records) are
//! descended by the validator; this module only answers "is this value of
//! that kind" and "does it satisfy these refinements".

use serde_json::{Number, Value};
use uuid::Uuid;

use super::types::{Constraints, FieldKind, Match};

/// Checks a scalar value against its kind and returns its canonical form.
///
/// Integers accept JSON numbers with no fractional part (`10.0` becomes `10`).
/// Foreign references accept a UUID string or `{"id": "<uuid>"}` and are
/// canonicalized to the object form.
pub fn check_scalar(kind: &FieldKind, value: &Value) -> Result<Value, String> {
    match kind {
        FieldKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err("expected a string".into()),
        },
        FieldKind::Integer => coerce_integer(value).ok_or_else(|| "expected an integer".into()),
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err("expected a number".into()),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err("expected a boolean".into()),
        },
        FieldKind::Foreign { reference } => {
            let id = reference_id(value)
                .ok_or_else(|| format!("expected a primary key reference to {}", reference))?;
            let mut key = serde_json::Map::new();
            key.insert("id".into(), Value::String(id));
            Ok(Value::Object(key))
        }
        FieldKind::Array { .. } => match value {
            Value::Array(_) => Ok(value.clone()),
            _ => Err("expected an array".into()),
        },
        FieldKind::Record { .. } => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err("expected a record".into()),
        },
    }
}

/// Expected-kind message for container kinds
pub fn expected_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Integer => "expected an integer".into(),
        FieldKind::Array { .. } => "expected an array".into(),
        FieldKind::Record { .. } => "expected a record".into(),
        other => format!("expected a {}", other.type_name()),
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    let Value::Number(n) = value else {
        return None;
    };
    if n.is_i64() {
        return Some(value.clone());
    }
    if n.is_u64() {
        return i64::try_from(n.as_u64()?).ok().map(Value::from);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(Value::Number(Number::from(f as i64)))
    } else {
        None
    }
}

/// Extracts a well-formed UUID from a reference value.
pub fn reference_id(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) if obj.len() == 1 => obj.get("id")?.as_str()?,
        _ => return None,
    };
    Uuid::parse_str(raw).ok().map(|u| u.hyphenated().to_string())
}

/// Checks refinements. Each refinement applies only to values it can
/// describe; a string pattern never matches a number.
pub fn check_refinements(value: &Value, constraints: &Constraints) -> Result<(), String> {
    if let Some(ref allowed) = constraints.one_of {
        if !allowed.iter().any(|a| values_equal(a, value)) {
            return Err(format!("expected one of: {}", list(allowed)));
        }
    }

    if let Some((lo, hi)) = constraints.between {
        match value.as_f64() {
            Some(n) if n >= lo && n <= hi => {}
            Some(_) => return Err(format!("value should be between {} and {}", lo, hi)),
            None => return Err("expected a number".into()),
        }
    }

    if let Some(ref pattern) = constraints.pattern {
        match value.as_str() {
            Some(s) if pattern.is_match(s) => {}
            Some(s) => {
                return Err(format!(
                    "invalid value '{}': the value must match pattern '{}'",
                    s,
                    pattern.as_str()
                ))
            }
            None => return Err("expected a string".into()),
        }
    }

    if let Some(ref prefix) = constraints.starts_with {
        match value.as_str() {
            Some(s) if s.starts_with(prefix.as_str()) => {}
            Some(_) => return Err(format!("should start with: {}", prefix)),
            None => return Err("expected a string".into()),
        }
    }

    if let Some(min) = constraints.len_min {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            _ => return Err("expected a string or an array".into()),
        };
        if len < min {
            return Err(format!("length must be at least {}", min));
        }
    }

    Ok(())
}

/// Checks one side of a conditional entity check against a present value.
pub fn check_match(value: &Value, m: &Match) -> Result<(), String> {
    check_refinements(value, &m.constraints)
}

/// Numeric-aware equality: `1` and `1.0` are the same enumerated value.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
