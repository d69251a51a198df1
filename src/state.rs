//! Shared application state for all routes. The registry is frozen once serving starts.

use crate::query::QueryCompiler;
use crate::registry::SchemaRegistry;
use crate::storage::StorageBackend;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SchemaRegistry>,
    pub store: Arc<dyn StorageBackend>,
    pub compiler: QueryCompiler,
    /// URL prefix every collection route hangs off, always starting and ending with `/`.
    pub prefix: String,
}

impl AppState {
    pub fn new(registry: SchemaRegistry, store: Arc<dyn StorageBackend>) -> Self {
        AppState {
            registry: Arc::new(registry),
            store,
            compiler: QueryCompiler::default(),
            prefix: "/".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.compiler = QueryCompiler::new(page_size);
        self
    }
}
