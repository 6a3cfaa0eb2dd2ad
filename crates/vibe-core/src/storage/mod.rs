//! Durable key-value storage for client state.
//!
//! Values are JSON strings. The offline queue is the main tenant.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::util::unix_timestamp_millis;

/// String key-value persistence that survives process restarts.
pub trait KeyValueStore: Send + Sync {
    /// Stored value, or `None` if the key was never written.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Replace the value stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// libSQL implementation of [`KeyValueStore`]
#[derive(Clone)]
pub struct LibSqlKeyValueStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlKeyValueStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open (or create) the store in a database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

impl KeyValueStore for LibSqlKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                libsql::params![key, value, unix_timestamp_millis()],
            )
            .await?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryEntries {
    values: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

/// In-memory [`KeyValueStore`] for tests and previews
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: StdMutex<MemoryEntries>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().values.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        if entries.fail_writes {
            return Err(Error::Storage(format!("write to '{key}' rejected")));
        }
        entries.values.insert(key.to_string(), value.to_string());
        entries.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn libsql_store_round_trips_and_replaces() {
        let store = LibSqlKeyValueStore::open_in_memory().await.unwrap();

        assert_eq!(store.get_item("k").await.unwrap(), None);
        store.set_item("k", "[1]").await.unwrap();
        store.set_item("k", "[1,2]").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("[1,2]"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn libsql_store_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.db");

        {
            let store = LibSqlKeyValueStore::open(&path).await.unwrap();
            store.set_item("vw_offline_queue", "[]").await.unwrap();
        }

        let reopened = LibSqlKeyValueStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_item("vw_offline_queue").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn memory_store_can_reject_writes() {
        let store = MemoryKeyValueStore::new();
        store.set_item("a", "1").await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store.set_item("a", "2").await,
            Err(Error::Storage(_))
        ));
        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.write_count(), 1);
    }
}
