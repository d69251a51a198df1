//! Storage contract (get/set/delete/search per collection) and its reference backends.
//!
//! - [`MemoryStore`]: in-memory tables, per-collection id counters and a query-result cache.
//! - [`FileStore`]: the same engine, loaded from a directory at startup and flushed back on exit.

mod eval;
mod file;
mod memory;

pub use file::{FileStore, COUNTERS_TABLE};
pub use memory::{MemoryStore, Snapshot};

use crate::error::StoreResult;
use crate::query::Query;
use crate::record::Instance;
use async_trait::async_trait;

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub records: Vec<Instance>,
    /// Matches after filtering, before paging.
    pub total: usize,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Point lookup by id, projected to `fields` when non-empty.
    async fn get(&self, collection: &str, id: u64, fields: &[String]) -> StoreResult<Instance>;

    /// Insert when `instance.id` is unset (allocating the next id), otherwise replace the existing
    /// record with that id. Returns the stored record.
    async fn set(&self, collection: &str, instance: Instance) -> StoreResult<Instance>;

    async fn delete(&self, collection: &str, id: u64) -> StoreResult<()>;

    /// Filter, sort, page and project. `total` counts matches before paging.
    async fn search(&self, collection: &str, query: &Query) -> StoreResult<SearchResult>;

    /// Persist state if the backend is durable.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
