//! Schema registry: append-only table of registered schemas, built once at startup.
//!
//! Registration derives each schema's collection name and rejects collisions. After startup the
//! registry is frozen behind an `Arc` and only read.

use crate::case::collection_name;
use crate::config::{self, FieldDef, SchemaDef};
use crate::error::ConfigError;
use crate::record::{Instance, Storable};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Collection names taken by fixed routes (route index, health, version).
pub const RESERVED_COLLECTIONS: &[&str] = &["routes", "health", "version"];

/// Prefix of storage-internal tables such as the file store's id counters.
pub const INTERNAL_PREFIX: &str = "_";

/// A registered schema: the descriptor every generic handler is parameterized by.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    def: SchemaDef,
    collection: String,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.def.fields
    }

    pub fn description(&self) -> Option<&str> {
        self.def.description.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.def.fields.iter().find(|f| f.name == name)
    }

    /// True for declared fields and the implicit `id`.
    pub fn has_field(&self, name: &str) -> bool {
        name == "id" || self.field(name).is_some()
    }

    /// Fresh instance: unset id, declared defaults applied, other fields null.
    pub fn new_instance(&self) -> Instance {
        Instance::new(config::declared_defaults(&self.def.fields))
    }

    pub fn definition(&self) -> &SchemaDef {
        &self.def
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<Schema>>,
    by_collection: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Register a declaration. Registering an identical declaration again is a no-op returning the
    /// existing schema; a different schema deriving the same collection name is a configuration error.
    pub fn register(&mut self, def: SchemaDef) -> Result<Arc<Schema>, ConfigError> {
        config::validate(&def)?;
        let collection = collection_name(&def.name);
        if RESERVED_COLLECTIONS.contains(&collection.as_str()) || collection.starts_with(INTERNAL_PREFIX) {
            return Err(ConfigError::Validation(format!(
                "schema {} maps to reserved collection '{}'",
                def.name, collection
            )));
        }
        if let Some(&idx) = self.by_collection.get(&collection) {
            let existing = &self.schemas[idx];
            if existing.def == def {
                return Ok(existing.clone());
            }
            return Err(ConfigError::DuplicateCollection {
                collection,
                first: existing.def.name.clone(),
                second: def.name,
            });
        }
        tracing::info!(schema = %def.name, collection = %collection, "registered schema");
        let schema = Arc::new(Schema { def, collection: collection.clone() });
        self.by_collection.insert(collection, self.schemas.len());
        self.schemas.push(schema.clone());
        Ok(schema)
    }

    /// Register a typed record declared in code.
    pub fn register_record<T: Storable>(&mut self) -> Result<Arc<Schema>, ConfigError> {
        self.register(T::schema_def())
    }

    /// Every reference field must point at a registered collection. Call once all schemas are in.
    pub fn check_references(&self) -> Result<(), ConfigError> {
        let known: HashSet<&str> = self.by_collection.keys().map(String::as_str).collect();
        config::validate_references(self.schemas.iter().map(|s| &s.def), &known)
    }

    /// Registered schemas in registration order.
    pub fn all_schemas(&self) -> &[Arc<Schema>] {
        &self.schemas
    }

    pub fn by_collection(&self, collection: &str) -> Option<&Arc<Schema>> {
        self.by_collection.get(collection).map(|&i| &self.schemas[i])
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
