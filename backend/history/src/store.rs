use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use screensage_core::{NewScreenshot, SageError, ScreenshotRecord};

/// Abstract interface over history persistence.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Assign an id, persist the record durably, and return the id. The
    /// record is visible to readers only after this returns Ok.
    async fn append(&self, record: NewScreenshot) -> Result<i64, SageError>;

    /// Most recent records, descending by timestamp with ties broken by
    /// descending id, bounded to `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<ScreenshotRecord>, SageError>;

    /// Fetch one record, or `SageError::NotFound`.
    async fn by_id(&self, id: i64) -> Result<ScreenshotRecord, SageError>;

    /// Delete one record, or `SageError::NotFound` when the id is absent.
    async fn delete(&self, id: i64) -> Result<(), SageError>;
}

/// In-process history store with the same ordering contract as the SQLite
/// store. Used by pipeline tests and as a stand-in when no database path
/// is configured.
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<i64, ScreenshotRecord>>,
    next_id: AtomicI64,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: NewScreenshot) -> Result<i64, SageError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut records = self.records.write().unwrap();
        records.insert(id, record.into_record(id));
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScreenshotRecord>, SageError> {
        let records = self.records.read().unwrap();
        let mut all: Vec<ScreenshotRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        all.truncate(limit);
        Ok(all)
    }

    async fn by_id(&self, id: i64) -> Result<ScreenshotRecord, SageError> {
        let records = self.records.read().unwrap();
        records.get(&id).cloned().ok_or(SageError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), SageError> {
        let mut records = self.records.write().unwrap();
        records.remove(&id).map(|_| ()).ok_or(SageError::NotFound(id))
    }
}
