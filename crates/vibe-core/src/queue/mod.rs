//! Durable queue of deferred writes.
//!
//! The whole queue is one JSON array stored under [`QUEUE_KEY`]. Every
//! read-modify-write of that array holds the storage lock. Flushes take a
//! separate lock and replay a snapshot without the storage lock, so enqueues
//! made during a slow flush complete immediately and survive its write-back.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Mutation, MutationId, QueuedMutation};
use crate::remote::{self, RemoteError, RemoteStore};
use crate::retry::RetryPolicy;
use crate::storage::KeyValueStore;

/// Storage key of the persisted queue.
pub const QUEUE_KEY: &str = "vw_offline_queue";

/// Outcome counts of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl FlushReport {
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// FIFO queue of pending mutations persisted in a [`KeyValueStore`].
///
/// Clones share the same storage and locks.
pub struct MutationQueue<K> {
    store: Arc<K>,
    lock: Arc<Mutex<()>>,
    flush_lock: Arc<Mutex<()>>,
    retry: RetryPolicy,
}

impl<K> Clone for MutationQueue<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock: Arc::clone(&self.lock),
            flush_lock: Arc::clone(&self.flush_lock),
            retry: self.retry,
        }
    }
}

impl<K: KeyValueStore> MutationQueue<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
            flush_lock: Arc::new(Mutex::new(())),
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy applied to each entry during a flush.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub const fn store(&self) -> &Arc<K> {
        &self.store
    }

    /// Append a mutation stamped with a fresh id and the current time.
    pub async fn queue_mutation(&self, mutation: Mutation) -> Result<MutationId> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read().await?;
        let entry = QueuedMutation::new(mutation);
        let id = entry.id.clone();
        tracing::debug!(
            mutation_id = %id,
            table = %entry.table,
            operation = entry.operation(),
            "Queueing offline mutation"
        );
        entries.push(entry);
        self.write(&entries).await?;

        Ok(id)
    }

    /// Pending entries, oldest first.
    pub async fn get_queue(&self) -> Result<Vec<QueuedMutation>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.get_queue().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.get_queue().await?.is_empty())
    }

    /// Replay every entry in FIFO order against `remote`.
    ///
    /// Flushes run one at a time over a snapshot of the queue. Successful
    /// entries are then removed from the stored queue; failed ones stay
    /// verbatim in their original order, followed by anything enqueued while
    /// the flush was running. Entry failures only show up in the report;
    /// storage failures are returned as errors and leave the stored queue
    /// untouched.
    pub async fn flush_queue<R: RemoteStore>(&self, remote: &R) -> Result<FlushReport> {
        let _flushing = self.flush_lock.lock().await;

        let snapshot = {
            let _guard = self.lock.lock().await;
            self.read().await?
        };
        if snapshot.is_empty() {
            return Ok(FlushReport::default());
        }

        tracing::info!(pending = snapshot.len(), "Flushing offline queue");

        let mut replayed = HashSet::new();
        for entry in &snapshot {
            let table = entry.table.as_str();
            let kind = &entry.kind;
            let result = self
                .retry
                .run_if(
                    move || remote::apply(remote, table, kind),
                    RemoteError::is_transient,
                )
                .await;

            match result {
                Ok(_) => {
                    tracing::debug!(mutation_id = %entry.id, table = %entry.table, "Replayed queued mutation");
                    replayed.insert(entry.id.clone());
                }
                Err(error) => {
                    tracing::warn!(
                        mutation_id = %entry.id,
                        table = %entry.table,
                        operation = entry.operation(),
                        "Queued mutation failed, keeping it for the next flush: {}",
                        error
                    );
                }
            }
        }

        if !replayed.is_empty() {
            let _guard = self.lock.lock().await;
            let mut entries = self.read().await?;
            entries.retain(|entry| !replayed.contains(&entry.id));
            self.write(&entries).await?;
        }

        let report = FlushReport {
            succeeded: replayed.len(),
            failed: snapshot.len() - replayed.len(),
        };
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Offline queue flush finished"
        );
        Ok(report)
    }

    async fn read(&self) -> Result<Vec<QueuedMutation>> {
        match self.store.get_item(QUEUE_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn write(&self, entries: &[QueuedMutation]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set_item(QUEUE_KEY, &raw).await?;
        tracing::debug!(pending = entries.len(), "Persisted offline queue");
        Ok(())
    }
}
