//! Generic CRUD execution against any storage backend, parameterized by a schema.

use crate::error::AppError;
use crate::query::Query;
use crate::record::Instance;
use crate::registry::Schema;
use crate::service::RequestValidator;
use crate::storage::{SearchResult, StorageBackend};
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// Filtered, sorted, paged and projected list.
    pub async fn list(
        store: &dyn StorageBackend,
        schema: &Schema,
        query: &Query,
    ) -> Result<SearchResult, AppError> {
        Ok(store.search(schema.collection_name(), query).await?)
    }

    pub async fn read(
        store: &dyn StorageBackend,
        schema: &Schema,
        id: u64,
        fields: &[String],
    ) -> Result<Instance, AppError> {
        Ok(store.get(schema.collection_name(), id, fields).await?)
    }

    /// Fetch a record and walk into it along `segments`. A segment that does not resolve fails
    /// with a validation error naming the failing prefix.
    pub async fn read_path(
        store: &dyn StorageBackend,
        schema: &Schema,
        id: u64,
        segments: &[&str],
    ) -> Result<Value, AppError> {
        let record = store.get(schema.collection_name(), id, &[]).await?;
        record.resolve_path(segments).map_err(|e| {
            AppError::Validation(format!("{}/{}: {}", schema.collection_name(), id, e))
        })
    }

    /// Store a submitted body. No id creates; an id replaces the existing record and fails when
    /// that record does not exist.
    pub async fn create(
        store: &dyn StorageBackend,
        schema: &Schema,
        body: Value,
    ) -> Result<Instance, AppError> {
        let instance = RequestValidator::instance_from_body(schema, body)?;
        Ok(store.set(schema.collection_name(), instance).await?)
    }

    /// Replace record `id` with the submitted body. Never creates.
    pub async fn replace(
        store: &dyn StorageBackend,
        schema: &Schema,
        id: u64,
        body: Value,
    ) -> Result<Instance, AppError> {
        let mut instance = RequestValidator::instance_from_body(schema, body)?;
        match instance.id {
            Some(body_id) if body_id != id => {
                return Err(AppError::Conflict(format!(
                    "body id {} does not match path id {}",
                    body_id, id
                )))
            }
            _ => instance.id = Some(id),
        }
        Ok(store.set(schema.collection_name(), instance).await?)
    }

    pub async fn delete(store: &dyn StorageBackend, schema: &Schema, id: u64) -> Result<(), AppError> {
        Ok(store.delete(schema.collection_name(), id).await?)
    }
}
