//! Schema declaration types, deserialized from JSON or built in code.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared type of a field.
///
/// JSON form: `"string" | "int" | "float" | "bool" | "datetime"`,
/// `{"reference": "<collection>"}`, `{"list": <type>}` or `{"nested": [<fields>]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    #[serde(rename = "datetime")]
    DateTime,
    /// Reference to a record of another collection, stored as `"<collection>/<id>"`.
    Reference(String),
    List(Box<FieldType>),
    /// Embedded value type with its own fields (no identifier of its own).
    Nested(Vec<FieldDef>),
}

impl FieldType {
    /// Short name used in error messages and the API description.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Reference(_) => "reference",
            FieldType::List(_) => "list",
            FieldType::Nested(_) => "nested",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldDef {
            name: name.into(),
            type_,
            required: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declared defaults keyed by field name; fields without one map to null.
pub fn declared_defaults(fields: &[FieldDef]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.name.clone(), f.default.clone().unwrap_or(Value::Null)))
        .collect()
}

/// A declared record type. The `id` field is implicit and system-assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        SchemaDef {
            name: name.into(),
            fields,
            description: None,
        }
    }
}
