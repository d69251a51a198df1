//! schemarest: schema-driven REST data layer.
//!
//! Declared schemas are registered once at startup; every registered schema gets list/create/read/
//! replace/delete routes, a query language (filter, sort, paging, projection) backed by a cached
//! storage engine, and an OpenAPI description.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod query;
pub mod record;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;

pub use case::collection_name;
pub use config::{build_registry, load_schema_defs, FieldDef, FieldType, SchemaDef, ServiceConfig};
pub use error::{AppError, ConfigError, StoreError};
pub use query::{Clause, Operator, Query, QueryCompiler, SortKey};
pub use record::{Instance, Storable};
pub use registry::{Schema, SchemaRegistry};
pub use response::{success_many, success_one};
pub use routes::{app, common_routes, entity_routes};
pub use service::{CrudService, Repository};
pub use state::AppState;
pub use storage::{FileStore, MemoryStore, StorageBackend};
