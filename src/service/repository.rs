//! Typed access to one collection for records declared in Rust.

use crate::error::{AppError, StoreError};
use crate::query::Query;
use crate::record::Storable;
use crate::storage::StorageBackend;
use std::marker::PhantomData;
use std::sync::Arc;

/// Stores and loads `T` through the same backend (and the same `Instance` form) the REST layer uses.
pub struct Repository<T: Storable> {
    store: Arc<dyn StorageBackend>,
    collection: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Storable> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            store: self.store.clone(),
            collection: self.collection.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Storable> Repository<T> {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        Repository {
            store,
            collection: T::collection_name(),
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Insert (no id) or replace (id set). Returns the stored record with its id.
    pub async fn save(&self, record: &T) -> Result<T, AppError> {
        let instance = record.to_instance().map_err(StoreError::from)?;
        let stored = self.store.set(&self.collection, instance).await?;
        Ok(T::from_instance(&stored).map_err(StoreError::from)?)
    }

    pub async fn find(&self, id: u64) -> Result<T, AppError> {
        let instance = self.store.get(&self.collection, id, &[]).await?;
        Ok(T::from_instance(&instance).map_err(StoreError::from)?)
    }

    pub async fn remove(&self, id: u64) -> Result<(), AppError> {
        Ok(self.store.delete(&self.collection, id).await?)
    }

    /// Matching records for `query` (projection is ignored) plus the total match count.
    pub async fn search(&self, query: &Query) -> Result<(Vec<T>, usize), AppError> {
        let query = Query {
            fields: Vec::new(),
            ..query.clone()
        };
        let result = self.store.search(&self.collection, &query).await?;
        let records = result
            .records
            .iter()
            .map(T::from_instance)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok((records, result.total))
    }
}
