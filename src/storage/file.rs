//! Directory-backed store: one `<collection>.json` per table plus a counters file.
//!
//! All reads and writes go through an inner [`MemoryStore`]; the directory is loaded once on
//! [`FileStore::open`] and written back by [`StorageBackend::flush`] or, best effort, on drop.

use super::memory::{MemoryStore, Snapshot};
use super::{SearchResult, StorageBackend};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::record::Instance;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// File stem of the per-collection id counters.
pub const COUNTERS_TABLE: &str = "_sys_counters";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    inner: MemoryStore,
    dirty: AtomicBool,
}

impl FileStore {
    /// Load every table found in `dir`, creating the directory when missing.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut snapshot = Snapshot::default();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let raw = tokio::fs::read_to_string(&path).await?;
            if stem == COUNTERS_TABLE {
                snapshot.counters = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))?;
                continue;
            }
            let mut table: BTreeMap<u64, Instance> = serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))?;
            for (id, record) in table.iter_mut() {
                record.id = Some(*id);
            }
            snapshot.tables.insert(stem, table);
        }

        let records: usize = snapshot.tables.values().map(BTreeMap::len).sum();
        tracing::info!(dir = %dir.display(), tables = snapshot.tables.len(), records, "opened file store");
        Ok(FileStore {
            dir,
            inner: MemoryStore::from_snapshot(snapshot),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when writes happened since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

/// Write every table and the counters, each through a temp file and rename.
fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    std::fs::create_dir_all(dir)?;
    for (name, table) in &snapshot.tables {
        write_atomic(&dir.join(format!("{}.json", name)), &serde_json::to_vec_pretty(table)?)?;
    }
    write_atomic(
        &dir.join(format!("{}.json", COUNTERS_TABLE)),
        &serde_json::to_vec_pretty(&snapshot.counters)?,
    )
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FileStore {
    async fn get(&self, collection: &str, id: u64, fields: &[String]) -> StoreResult<Instance> {
        self.inner.get(collection, id, fields).await
    }

    async fn set(&self, collection: &str, instance: Instance) -> StoreResult<Instance> {
        let stored = self.inner.set(collection, instance).await?;
        self.mark_dirty();
        Ok(stored)
    }

    async fn delete(&self, collection: &str, id: u64) -> StoreResult<()> {
        self.inner.delete(collection, id).await?;
        self.mark_dirty();
        Ok(())
    }

    async fn search(&self, collection: &str, query: &Query) -> StoreResult<SearchResult> {
        self.inner.search(collection, query).await
    }

    async fn flush(&self) -> StoreResult<()> {
        // clear first so writes racing the flush leave the store dirty
        self.dirty.store(false, Ordering::Release);
        let snapshot = self.inner.snapshot().await;
        let dir = self.dir.clone();
        let result = tokio::task::spawn_blocking(move || write_snapshot(&dir, &snapshot))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
            .and_then(|r| r);
        if result.is_err() {
            self.mark_dirty();
        }
        result?;
        tracing::debug!(dir = %self.dir.display(), "flushed file store");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if !self.is_dirty() {
            return;
        }
        let Some(snapshot) = self.inner.try_snapshot() else {
            tracing::warn!(dir = %self.dir.display(), "store busy on drop; unflushed writes lost");
            return;
        };
        if let Err(e) = write_snapshot(&self.dir, &snapshot) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "flush on drop failed");
        }
    }
}
