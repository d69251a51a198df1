//! Record instances, the `Storable` capability for typed records, and path-walk resolution.

use crate::case::collection_name;
use crate::config::{FieldDef, SchemaDef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored (or to-be-stored) value of some registered schema.
///
/// `id` is `None` until the storage engine assigns one; the declared fields live in `fields`.
/// Serializes flat: `{"id": 1, "name": "ada", ...}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Instance {
    pub fn new(fields: Map<String, Value>) -> Self {
        Instance { id: None, fields }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Field value by name; `id` resolves to the identifier.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == "id" {
            return Some(self.id.map(Value::from).unwrap_or(Value::Null));
        }
        self.fields.get(field).cloned()
    }

    /// Borrowing lookup for declared fields (not `id`).
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Keep only the listed fields (plus `id`). An empty list keeps everything.
    pub fn project(&self, fields: &[String]) -> Instance {
        if fields.is_empty() {
            return self.clone();
        }
        let kept = fields
            .iter()
            .filter_map(|f| self.fields.get(f).map(|v| (f.clone(), v.clone())))
            .collect();
        Instance { id: self.id, fields: kept }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert("id".into(), self.id.map(Value::from).unwrap_or(Value::Null));
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Walk into the record along `segments` (field names or list indexes, in any nesting).
    /// The first segment that does not resolve is reported with the full prefix up to and including it.
    pub fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Value, PathError> {
        let root = self.to_value();
        let mut current = &root;
        let mut walked: Vec<&str> = Vec::with_capacity(segments.len());
        for seg in segments {
            let seg = seg.as_ref();
            walked.push(seg);
            let next = match current {
                Value::Object(map) => map.get(seg),
                Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| PathError {
                prefix: walked.join("/"),
                reason: match current {
                    Value::Object(_) => "no such field",
                    Value::Array(_) => "index out of range or not an index",
                    _ => "cannot descend into a scalar",
                },
            })?;
        }
        Ok(current.clone())
    }
}

/// A path-walk step that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub prefix: String,
    pub reason: &'static str,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve '{}': {}", self.prefix, self.reason)
    }
}

impl std::error::Error for PathError {}

/// A Rust type that can be registered as a schema and stored through a [`crate::service::Repository`].
///
/// The serialized form must carry the identifier as an optional `id` field and every
/// declared field under its declared name.
pub trait Storable: Serialize + DeserializeOwned + Send + Sync {
    /// Declared type name, e.g. `"Message"`.
    const NAME: &'static str;

    fn fields() -> Vec<FieldDef>;

    fn collection_name() -> String {
        collection_name(Self::NAME)
    }

    fn schema_def() -> SchemaDef {
        SchemaDef::new(Self::NAME, Self::fields())
    }

    fn to_instance(&self) -> Result<Instance, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    fn from_instance(instance: &Instance) -> Result<Self, serde_json::Error> {
        serde_json::from_value(instance.to_value())
    }
}
