//! In-memory storage engine with per-collection id counters and a filter+sort result cache.

use super::eval::{matches_all, sort_records};
use super::{SearchResult, StorageBackend};
use crate::error::{StoreError, StoreResult};
use crate::query::{CacheKey, Query};
use crate::record::Instance;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type Table = BTreeMap<u64, Instance>;

/// Full engine state in a serializable shape: tables plus the next id per collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tables: BTreeMap<String, Table>,
    pub counters: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    /// Next id to hand out per collection. Never decremented.
    counters: HashMap<String, u64>,
    cache: HashMap<CacheKey, Arc<Vec<Instance>>>,
}

/// Thread-safe in-memory backend.
///
/// One engine-wide read/write lock guards tables, counters and cache: point reads and cache hits
/// take the read side; writes and cache rebuilds take the write side. Any successful write clears
/// the whole cache.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    recomputations: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Rebuild from a snapshot. Counters missing or behind the highest stored id are raised past it.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut counters: HashMap<String, u64> = snapshot.counters.into_iter().collect();
        for (name, table) in &snapshot.tables {
            let floor = table.keys().next_back().map_or(1, |max| max + 1);
            let next = counters.entry(name.clone()).or_insert(floor);
            *next = (*next).max(floor);
        }
        MemoryStore {
            state: RwLock::new(State {
                tables: snapshot.tables.into_iter().collect(),
                counters,
                cache: HashMap::new(),
            }),
            recomputations: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        Self::snapshot_of(&*self.state.read().await)
    }

    /// Non-blocking snapshot; `None` while a writer holds the lock.
    pub fn try_snapshot(&self) -> Option<Snapshot> {
        self.state.try_read().ok().map(|s| Self::snapshot_of(&s))
    }

    fn snapshot_of(state: &State) -> Snapshot {
        Snapshot {
            tables: state.tables.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            counters: state.counters.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Number of times a filtered+sorted list had to be computed (cache misses).
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }

    /// Number of cached filter+sort result lists.
    pub async fn cached_queries(&self) -> usize {
        self.state.read().await.cache.len()
    }

    fn page(list: &[Instance], query: &Query) -> SearchResult {
        let records = list
            .iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|r| r.project(&query.fields))
            .collect();
        SearchResult {
            records,
            total: list.len(),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn get(&self, collection: &str, id: u64, fields: &[String]) -> StoreResult<Instance> {
        let state = self.state.read().await;
        state
            .tables
            .get(collection)
            .and_then(|t| t.get(&id))
            .map(|r| r.project(fields))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    async fn set(&self, collection: &str, mut instance: Instance) -> StoreResult<Instance> {
        let mut state = self.state.write().await;
        let id = match instance.id {
            Some(id) => {
                let exists = state.tables.get(collection).is_some_and(|t| t.contains_key(&id));
                if !exists {
                    return Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        id,
                    });
                }
                id
            }
            None => {
                let next = state.counters.entry(collection.to_string()).or_insert(1);
                let id = *next;
                *next += 1;
                if state.tables.get(collection).is_some_and(|t| t.contains_key(&id)) {
                    return Err(StoreError::Conflict(format!(
                        "allocated id {} already present in {}",
                        id, collection
                    )));
                }
                instance.id = Some(id);
                id
            }
        };
        state
            .tables
            .entry(collection.to_string())
            .or_default()
            .insert(id, instance.clone());
        state.cache.clear();
        tracing::debug!(collection = %collection, id, "stored record");
        Ok(instance)
    }

    async fn delete(&self, collection: &str, id: u64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let removed = state.tables.get_mut(collection).and_then(|t| t.remove(&id));
        if removed.is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        state.cache.clear();
        tracing::debug!(collection = %collection, id, "deleted record");
        Ok(())
    }

    async fn search(&self, collection: &str, query: &Query) -> StoreResult<SearchResult> {
        let key = query.cache_key(collection);
        {
            let state = self.state.read().await;
            if let Some(list) = state.cache.get(&key) {
                tracing::debug!(collection = %collection, "query cache hit");
                return Ok(Self::page(list, query));
            }
        }

        let mut state = self.state.write().await;
        // another writer may have filled it while we waited
        if let Some(list) = state.cache.get(&key) {
            return Ok(Self::page(list, query));
        }
        let mut matched = Vec::new();
        if let Some(table) = state.tables.get(collection) {
            for record in table.values() {
                if matches_all(record, &query.filter)? {
                    matched.push(record.clone());
                }
            }
        }
        sort_records(&mut matched, &query.sort);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(collection = %collection, matched = matched.len(), "query cache miss");

        let list = Arc::new(matched);
        state.cache.insert(key, list.clone());
        Ok(Self::page(&list, query))
    }
}
