//! Filter evaluation and ordering over stored JSON values.
//!
//! The right-hand side of a clause is coerced to the JSON type of the stored left-hand value
//! before comparing; a value that cannot be coerced is a clause-level validation error.

use crate::error::{StoreError, StoreResult};
use crate::query::{Clause, Operator, SortKey};
use crate::record::Instance;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Field value of an instance; missing fields read as null.
pub(crate) fn lookup<'a>(inst: &'a Instance, field: &str) -> Cow<'a, Value> {
    if field == "id" {
        return Cow::Owned(inst.id.map(Value::from).unwrap_or(Value::Null));
    }
    match inst.field(field) {
        Some(v) => Cow::Borrowed(v),
        None => Cow::Owned(Value::Null),
    }
}

/// True when the instance satisfies every clause.
pub(crate) fn matches_all(inst: &Instance, clauses: &[Clause]) -> StoreResult<bool> {
    for clause in clauses {
        if !matches(inst, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn matches(inst: &Instance, clause: &Clause) -> StoreResult<bool> {
    let lhs = lookup(inst, &clause.field);
    if clause.op == Operator::Contains {
        let haystack = match lhs.as_ref() {
            Value::String(s) => s.to_lowercase(),
            Value::Null => return Ok(false),
            other => other.to_string().to_lowercase(),
        };
        return Ok(haystack.contains(&clause.value.to_lowercase()));
    }

    let rhs = coerce(clause, &lhs)?;
    let ord = compare_same_type(&lhs, &rhs);
    Ok(match clause.op {
        Operator::Eq => ord == Some(Ordering::Equal),
        Operator::Ne => ord != Some(Ordering::Equal),
        Operator::Lt => ord == Some(Ordering::Less),
        Operator::Gt => ord == Some(Ordering::Greater),
        Operator::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        Operator::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Contains => false,
    })
}

fn coerce(clause: &Clause, lhs: &Value) -> StoreResult<Value> {
    let raw = clause.value.as_str();
    let fail = |expected: &str| {
        StoreError::Validation(format!(
            "filter '{}': '{}' is not a valid {} for field {}",
            clause, raw, expected, clause.field
        ))
    };
    Ok(match lhs {
        Value::Null => {
            if raw.eq_ignore_ascii_case("null") {
                Value::Null
            } else {
                Value::String(raw.to_string())
            }
        }
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(fail("bool")),
        },
        Value::Number(n) => {
            if n.is_f64() {
                let f: f64 = raw.trim().parse().map_err(|_| fail("number"))?;
                Number::from_f64(f).map(Value::Number).ok_or_else(|| fail("number"))?
            } else if let Ok(i) = raw.trim().parse::<i64>() {
                Value::from(i)
            } else {
                let f: f64 = raw.trim().parse().map_err(|_| fail("number"))?;
                Number::from_f64(f).map(Value::Number).ok_or_else(|| fail("number"))?
            }
        }
        Value::String(_) => Value::String(raw.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::from_str(raw).map_err(|_| fail("JSON value"))?,
    })
}

/// Ordering between values of the same JSON type; `None` across types.
fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            Some(total_cmp(a, b))
        }
        _ => None,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (x.as_i64(), y.as_i64()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => match (x.as_u64(), y.as_u64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting: null < bool < number < string < array < object.
pub(crate) fn total_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let o = total_cmp(l, r);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => match type_rank(a).cmp(&type_rank(b)) {
            Ordering::Equal => compare_same_type(a, b).unwrap_or(Ordering::Equal),
            o => o,
        },
    }
}

/// Multi-key sort by successive stable single-key sorts, applied from the last key to the first
/// so the first key ends up primary.
pub(crate) fn sort_records(records: &mut [Instance], keys: &[SortKey]) {
    for key in keys.iter().rev() {
        records.sort_by(|a, b| {
            let o = total_cmp(&lookup(a, &key.field), &lookup(b, &key.field));
            if key.descending {
                o.reverse()
            } else {
                o
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inst(v: Value) -> Instance {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn coerces_rhs_to_stored_type() {
        let r = inst(json!({"id": 1, "age": 30, "score": 2.5, "active": true, "name": "Ada"}));
        assert!(matches(&r, &Clause::new("age", Operator::Eq, "30")).unwrap());
        assert!(matches(&r, &Clause::new("age", Operator::Gt, "29.5")).unwrap());
        assert!(matches(&r, &Clause::new("score", Operator::Le, "2.5")).unwrap());
        assert!(matches(&r, &Clause::new("active", Operator::Eq, "TRUE")).unwrap());
        assert!(matches(&r, &Clause::new("id", Operator::Eq, "1")).unwrap());
        assert!(matches(&r, &Clause::new("name", Operator::Ne, "Bob")).unwrap());
        // lexicographic for strings
        assert!(matches(&r, &Clause::new("name", Operator::Lt, "B")).unwrap());
    }

    #[test]
    fn coercion_failure_is_a_validation_error() {
        let r = inst(json!({"age": 30, "active": false}));
        let err = matches(&r, &Clause::new("age", Operator::Gt, "old")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(err.to_string().contains("age>old"), "{}", err);
        assert!(matches(&r, &Clause::new("active", Operator::Eq, "maybe")).is_err());
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let r = inst(json!({"name": "Ada Lovelace", "tags": ["Math"], "nick": null}));
        assert!(matches(&r, &Clause::new("name", Operator::Contains, "LOVE")).unwrap());
        assert!(!matches(&r, &Clause::new("name", Operator::Contains, "byron")).unwrap());
        assert!(matches(&r, &Clause::new("tags", Operator::Contains, "math")).unwrap());
        assert!(!matches(&r, &Clause::new("nick", Operator::Contains, "a")).unwrap());
    }

    #[test]
    fn null_and_missing_fields() {
        let r = inst(json!({"nick": null}));
        assert!(matches(&r, &Clause::new("nick", Operator::Eq, "null")).unwrap());
        assert!(matches(&r, &Clause::new("absent", Operator::Eq, "null")).unwrap());
        assert!(!matches(&r, &Clause::new("nick", Operator::Eq, "x")).unwrap());
        assert!(!matches(&r, &Clause::new("nick", Operator::Gt, "1")).unwrap());
    }

    #[test]
    fn reverse_applied_stable_sort_gives_primary_first_key() {
        let mut rs: Vec<Instance> = [
            json!({"id": 1, "age": 20, "name": "c"}),
            json!({"id": 2, "age": 30, "name": "b"}),
            json!({"id": 3, "age": 20, "name": "a"}),
            json!({"id": 4, "age": 30, "name": "a"}),
        ]
        .into_iter()
        .map(inst)
        .collect();
        sort_records(&mut rs, &[SortKey::desc("age"), SortKey::asc("name")]);
        let ids: Vec<_> = rs.iter().map(|r| r.id.unwrap()).collect();
        assert_eq!(ids, [4, 2, 3, 1]);
    }

    #[test]
    fn nulls_sort_first() {
        let mut rs: Vec<Instance> = [json!({"id": 1, "age": 5}), json!({"id": 2})]
            .into_iter()
            .map(inst)
            .collect();
        sort_records(&mut rs, &[SortKey::asc("age")]);
        assert_eq!(rs[0].id, Some(2));
    }
}
