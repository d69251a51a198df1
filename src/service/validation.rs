//! Request-body validation against a schema's declared fields.

use crate::config::{declared_defaults, FieldDef, FieldType};
use crate::error::AppError;
use crate::record::Instance;
use crate::registry::Schema;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::OnceLock;

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_]+)/(\d+)$").expect("static regex"))
}

pub struct RequestValidator;

impl RequestValidator {
    /// Turn a submitted JSON body into an instance of `schema`.
    ///
    /// The schema's fresh instance seeds the result. Unknown keys are rejected. Missing (or null)
    /// fields keep the seeded default, fail when required, and are stored as null otherwise.
    /// Defaults go through the same normalization as submitted values. `id` may be absent, null or
    /// a non-negative integer.
    pub fn instance_from_body(schema: &Schema, body: Value) -> Result<Instance, AppError> {
        let Value::Object(mut map) = body else {
            return Err(AppError::Validation("body must be a JSON object".into()));
        };
        let id = match map.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) if n.as_u64().is_some() => n.as_u64(),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "id must be a non-negative integer, got {}",
                    other
                )))
            }
        };
        let mut instance = schema.new_instance();
        instance.id = id;
        instance.fields =
            fill_object("", schema.fields(), instance.fields, map).map_err(AppError::Validation)?;
        Ok(instance)
    }
}

/// Type-check a single value (declared defaults use this at startup).
pub fn check_value(path: &str, ty: &FieldType, value: &Value) -> Result<(), String> {
    normalize(path, ty, value.clone()).map(|_| ())
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

fn fill_object(
    path: &str,
    fields: &[FieldDef],
    mut seed: Map<String, Value>,
    mut map: Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    if let Some(unknown) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
        return Err(format!("{}: unknown field", join(path, unknown)));
    }
    let mut out = Map::with_capacity(fields.len());
    for f in fields {
        let p = join(path, &f.name);
        let value = match map.remove(&f.name) {
            Some(v) if !v.is_null() => normalize(&p, &f.type_, v)?,
            _ => match seed.remove(&f.name) {
                Some(d) if !d.is_null() => normalize(&p, &f.type_, d)?,
                _ if f.required => return Err(format!("{} is required", p)),
                _ => Value::Null,
            },
        };
        out.insert(f.name.clone(), value);
    }
    Ok(out)
}

/// Check `value` against `ty`, returning it in canonical form (integral floats become ints,
/// nested objects are filled).
fn normalize(path: &str, ty: &FieldType, value: Value) -> Result<Value, String> {
    if value.is_null() {
        return Ok(value);
    }
    let mismatch = |v: &Value| format!("{} must be {}, got {}", path, expected(ty), v);
    match ty {
        FieldType::String => match value {
            Value::String(_) => Ok(value),
            v => Err(mismatch(&v)),
        },
        FieldType::Int => {
            if value.is_i64() || value.is_u64() {
                return Ok(value);
            }
            match value.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::Number(Number::from(f as i64))),
                _ => Err(mismatch(&value)),
            }
        }
        FieldType::Float => match value {
            Value::Number(_) => Ok(value),
            v => Err(mismatch(&v)),
        },
        FieldType::Bool => match value {
            Value::Bool(_) => Ok(value),
            v => Err(mismatch(&v)),
        },
        FieldType::DateTime => {
            if value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            {
                Ok(value)
            } else {
                Err(mismatch(&value))
            }
        }
        FieldType::Reference(target) => {
            let points_at_target = value
                .as_str()
                .and_then(|s| reference_re().captures(s))
                .is_some_and(|caps| &caps[1] == target.as_str());
            if points_at_target {
                Ok(value)
            } else {
                Err(mismatch(&value))
            }
        }
        FieldType::List(inner) => match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| normalize(&join(path, &i.to_string()), inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            v => Err(mismatch(&v)),
        },
        FieldType::Nested(fields) => match value {
            Value::Object(map) => fill_object(path, fields, declared_defaults(fields), map).map(Value::Object),
            v => Err(mismatch(&v)),
        },
    }
}

fn expected(ty: &FieldType) -> String {
    match ty {
        FieldType::String => "a string".into(),
        FieldType::Int => "an integer".into(),
        FieldType::Float => "a number".into(),
        FieldType::Bool => "a boolean".into(),
        FieldType::DateTime => "an RFC 3339 datetime".into(),
        FieldType::Reference(target) => format!("a reference '{}/<id>'", target),
        FieldType::List(_) => "a list".into(),
        FieldType::Nested(_) => "an object".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaDef;
    use crate::registry::SchemaRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn company() -> Arc<Schema> {
        let mut reg = SchemaRegistry::new();
        reg.register(SchemaDef::new("User", vec![])).unwrap();
        reg.register(SchemaDef::new(
            "Company",
            vec![
                FieldDef::new("name", FieldType::String).required(),
                FieldDef::new("size", FieldType::Int).with_default(json!(1)),
                FieldDef::new("founded", FieldType::DateTime),
                FieldDef::new("owner", FieldType::Reference("users".into())),
                FieldDef::new(
                    "offices",
                    FieldType::List(Box::new(FieldType::Nested(vec![
                        FieldDef::new("city", FieldType::String).required(),
                        FieldDef::new("floors", FieldType::List(Box::new(FieldType::Int))),
                    ]))),
                ),
            ],
        ))
        .unwrap()
    }

    fn reject(body: Value) -> String {
        match RequestValidator::instance_from_body(&company(), body) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn fills_defaults_and_nulls() {
        let inst = RequestValidator::instance_from_body(&company(), json!({"name": "Acme"})).unwrap();
        assert_eq!(inst.id, None);
        assert_eq!(inst.field("size"), Some(&json!(1)));
        assert_eq!(inst.field("founded"), Some(&Value::Null));
        assert_eq!(inst.fields.len(), 5);
    }

    #[test]
    fn accepts_well_typed_nested_values() {
        let inst = RequestValidator::instance_from_body(
            &company(),
            json!({
                "id": 4,
                "name": "Acme",
                "size": 12.0,
                "founded": "1999-01-01T00:00:00Z",
                "owner": "users/3",
                "offices": [{"city": "Oslo", "floors": [1, 2]}]
            }),
        )
        .unwrap();
        assert_eq!(inst.id, Some(4));
        assert_eq!(inst.field("size"), Some(&json!(12)));
        assert_eq!(inst.resolve_path(&["offices", "0", "floors"]).unwrap(), json!([1, 2]));
    }

    #[test]
    fn rejects_bad_bodies_with_field_paths() {
        assert!(reject(json!([])).contains("JSON object"));
        assert!(reject(json!({})).contains("name is required"));
        assert!(reject(json!({"name": "A", "colour": "red"})).contains("colour: unknown field"));
        assert!(reject(json!({"name": "A", "size": 1.5})).contains("size must be an integer"));
        assert!(reject(json!({"name": "A", "founded": "yesterday"})).contains("founded"));
        assert!(reject(json!({"name": "A", "owner": "teams/1"})).contains("owner"));
        assert!(reject(json!({"name": "A", "id": -1})).contains("id must be"));
        let msg = reject(json!({"name": "A", "offices": [{"city": "Oslo", "floors": ["x"]}]}));
        assert!(msg.starts_with("offices.0.floors.0"), "{}", msg);
        let msg = reject(json!({"name": "A", "offices": [{}]}));
        assert_eq!(msg, "offices.0.city is required");
    }

    #[test]
    fn defaults_are_stored_in_canonical_form() {
        let mut reg = SchemaRegistry::new();
        let schema = reg
            .register(SchemaDef::new(
                "Gauge",
                vec![
                    FieldDef::new("level", FieldType::Int).with_default(json!(12.0)),
                    FieldDef::new(
                        "parts",
                        FieldType::List(Box::new(FieldType::Nested(vec![
                            FieldDef::new("size", FieldType::Int).with_default(json!(3.0)),
                        ]))),
                    ),
                ],
            ))
            .unwrap();
        let inst = RequestValidator::instance_from_body(&schema, json!({"parts": [{}]})).unwrap();
        let level = inst.field("level").unwrap();
        assert!(level.is_i64(), "{}", level);
        assert_eq!(level, &json!(12));
        let size = inst.resolve_path(&["parts", "0", "size"]).unwrap();
        assert!(size.is_i64(), "{}", size);
    }

    #[test]
    fn check_value_validates_defaults() {
        assert!(check_value("n", &FieldType::Int, &json!(3)).is_ok());
        assert!(check_value("n", &FieldType::Int, &json!("3")).is_err());
        assert!(check_value("t", &FieldType::List(Box::new(FieldType::Bool)), &json!([true])).is_ok());
    }
}
