//! Declaration validation: field naming, reserved names, defaults and reference integrity.

use crate::config::{FieldDef, FieldType, SchemaDef};
use crate::error::ConfigError;
use crate::query::RESERVED_PARAMS;
use crate::service::check_value;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// Validate one schema declaration in isolation (references are checked by [`validate_references`]).
pub fn validate(def: &SchemaDef) -> Result<(), ConfigError> {
    if !identifier_re().is_match(&def.name) {
        return Err(ConfigError::Validation(format!(
            "schema name '{}' must be an identifier",
            def.name
        )));
    }
    validate_fields(&def.name, &def.fields, true)
}

fn validate_fields(schema: &str, fields: &[FieldDef], top_level: bool) -> Result<(), ConfigError> {
    let invalid = |field: &str, reason: String| ConfigError::InvalidField {
        schema: schema.to_string(),
        field: field.to_string(),
        reason,
    };
    let mut seen = HashSet::new();
    for f in fields {
        if !identifier_re().is_match(&f.name) {
            return Err(invalid(&f.name, "name must be an identifier".into()));
        }
        if top_level && f.name == "id" {
            return Err(invalid(&f.name, "'id' is system-assigned".into()));
        }
        if top_level && RESERVED_PARAMS.contains(&f.name.as_str()) {
            return Err(invalid(&f.name, "name is a reserved query parameter".into()));
        }
        if !seen.insert(f.name.as_str()) {
            return Err(invalid(&f.name, "declared twice".into()));
        }
        if let Some(default) = &f.default {
            check_value(&f.name, &f.type_, default)
                .map_err(|reason| invalid(&f.name, format!("bad default: {}", reason)))?;
        }
        validate_type(schema, &f.name, &f.type_)?;
    }
    Ok(())
}

fn validate_type(schema: &str, field: &str, ty: &FieldType) -> Result<(), ConfigError> {
    match ty {
        FieldType::List(inner) => validate_type(schema, field, inner),
        FieldType::Nested(fields) => validate_fields(schema, fields, false),
        FieldType::Reference(target) if target.is_empty() => Err(ConfigError::InvalidField {
            schema: schema.to_string(),
            field: field.to_string(),
            reason: "reference without target collection".into(),
        }),
        _ => Ok(()),
    }
}

/// Every reference field must name a collection in `collections`.
pub fn validate_references<'a>(
    defs: impl IntoIterator<Item = &'a SchemaDef>,
    collections: &HashSet<&str>,
) -> Result<(), ConfigError> {
    fn walk(ty: &FieldType, collections: &HashSet<&str>) -> Result<(), ConfigError> {
        match ty {
            FieldType::Reference(target) if !collections.contains(target.as_str()) => {
                Err(ConfigError::MissingReference {
                    kind: "collection",
                    id: target.clone(),
                })
            }
            FieldType::List(inner) => walk(inner, collections),
            FieldType::Nested(fields) => fields.iter().try_for_each(|f| walk(&f.type_, collections)),
            _ => Ok(()),
        }
    }
    for def in defs {
        for f in &def.fields {
            walk(&f.type_, collections)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> SchemaDef {
        SchemaDef::new(
            "User",
            vec![
                FieldDef::new("name", FieldType::String).required(),
                FieldDef::new("age", FieldType::Int),
            ],
        )
    }

    #[test]
    fn accepts_plain_schema() {
        assert!(validate(&user()).is_ok());
    }

    #[test]
    fn rejects_declared_id_and_reserved_names() {
        let mut def = user();
        def.fields.push(FieldDef::new("id", FieldType::Int));
        assert!(matches!(validate(&def), Err(ConfigError::InvalidField { .. })));

        let mut def = user();
        def.fields.push(FieldDef::new("limit", FieldType::Int));
        assert!(matches!(validate(&def), Err(ConfigError::InvalidField { .. })));
    }

    #[test]
    fn rejects_duplicate_field_and_bad_default() {
        let mut def = user();
        def.fields.push(FieldDef::new("age", FieldType::Int));
        assert!(validate(&def).is_err());

        let def = SchemaDef::new(
            "User",
            vec![FieldDef::new("age", FieldType::Int).with_default(json!("old"))],
        );
        let err = validate(&def).unwrap_err().to_string();
        assert!(err.contains("bad default"), "{}", err);
    }

    #[test]
    fn reference_targets_must_exist() {
        let def = SchemaDef::new(
            "Post",
            vec![FieldDef::new(
                "authors",
                FieldType::List(Box::new(FieldType::Reference("users".into()))),
            )],
        );
        let known: HashSet<&str> = ["posts"].into_iter().collect();
        assert!(matches!(
            validate_references([&def], &known),
            Err(ConfigError::MissingReference { .. })
        ));
        let known: HashSet<&str> = ["posts", "users"].into_iter().collect();
        assert!(validate_references([&def], &known).is_ok());
    }
}
