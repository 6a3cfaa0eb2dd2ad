//! Client facade shared by the domain services.
//!
//! `VibeClient` owns the collaborators (remote store, durable queue,
//! connectivity, session) and the write policy: retry transient failures,
//! classify the rest, and defer replay-safe writes to the queue when the
//! network is unavailable.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api_error::{handle_remote_error, ApiError};
use crate::auth::{AuthUser, SessionProvider};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{Mutation, MutationId};
use crate::queue::MutationQueue;
use crate::remote::{self, Query, RemoteError, RemoteResult, RemoteStore, Row};
use crate::retry::RetryPolicy;
use crate::storage::KeyValueStore;
use crate::sync::{self, SyncHandle};

/// Result of a write that may have been deferred.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Rows the backend returned
    Persisted(Vec<Row>),
    /// Queued for replay on reconnect
    Deferred(MutationId),
}

/// Status of a write that returns no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Queued(MutationId),
}

impl From<WriteOutcome> for SaveStatus {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Persisted(_) => Self::Saved,
            WriteOutcome::Deferred(id) => Self::Queued(id),
        }
    }
}

pub struct VibeClient<R, K, C, A> {
    remote: Arc<R>,
    queue: MutationQueue<K>,
    connectivity: Arc<C>,
    session: Arc<A>,
    retry: RetryPolicy,
}

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    pub fn new(
        remote: Arc<R>,
        queue: MutationQueue<K>,
        connectivity: Arc<C>,
        session: Arc<A>,
    ) -> Self {
        let retry = queue.retry_policy();
        Self {
            remote,
            queue,
            connectivity,
            session,
            retry,
        }
    }

    /// Retry policy for direct remote calls.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub const fn queue(&self) -> &MutationQueue<K> {
        &self.queue
    }

    pub const fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub const fn connectivity(&self) -> &Arc<C> {
        &self.connectivity
    }

    /// Flush the queue on every reconnect until the handle is cancelled.
    pub fn start_queue_sync(&self) -> SyncHandle {
        sync::start_queue_sync(
            self.queue.clone(),
            Arc::clone(&self.remote),
            self.connectivity.as_ref(),
        )
    }

    pub(crate) async fn require_user(&self) -> Result<AuthUser> {
        self.session
            .current_user()
            .await?
            .ok_or(Error::NotAuthenticated)
    }

    /// Signed-in user, or `None` for reads that degrade to empty results.
    pub(crate) async fn optional_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.session.current_user().await?)
    }

    /// Fail fast for writes that cannot be replayed safely later.
    pub(crate) async fn require_online(&self) -> Result<()> {
        if self.connectivity.is_connected().await {
            Ok(())
        } else {
            Err(Error::Offline)
        }
    }

    async fn call<F, Fut>(&self, operation: F) -> RemoteResult<Vec<Row>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<Vec<Row>>>,
    {
        self.retry
            .run_if(operation, RemoteError::is_transient)
            .await
    }

    pub(crate) async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>> {
        let remote = self.remote.as_ref();
        self.call(move || remote.select(table, query.clone()))
            .await
            .map_err(handle_remote_error)
    }

    /// Matching row count, computed by the backend.
    pub(crate) async fn count(&self, table: &str, query: Query) -> Result<usize> {
        let remote = self.remote.as_ref();
        self.retry
            .run_if(
                move || remote.count(table, query.clone()),
                RemoteError::is_transient,
            )
            .await
            .map_err(handle_remote_error)
    }

    /// Perform `mutation` directly; failures are classified, never queued.
    pub(crate) async fn execute(&self, mutation: &Mutation) -> Result<Vec<Row>> {
        let remote = self.remote.as_ref();
        let (table, kind) = (mutation.table(), mutation.kind());
        self.call(move || remote::apply(remote, table, kind))
            .await
            .map_err(handle_remote_error)
    }

    /// Insert several rows in one call.
    pub(crate) async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let remote = self.remote.as_ref();
        self.call(move || remote.insert(table, rows.clone()))
            .await
            .map_err(handle_remote_error)
    }

    /// Perform `mutation` directly, or queue it when offline or when the
    /// network drops out during the call. Other failures are classified.
    pub(crate) async fn write_or_defer(&self, mutation: Mutation) -> Result<WriteOutcome> {
        if !self.connectivity.is_connected().await {
            return self.defer(mutation, "offline").await;
        }

        let remote = self.remote.as_ref();
        let (table, kind) = (mutation.table(), mutation.kind());
        let result = self
            .call(move || remote::apply(remote, table, kind))
            .await;

        match result {
            Ok(rows) => Ok(WriteOutcome::Persisted(rows)),
            Err(error) if error.is_network() => self.defer(mutation, "network failure").await,
            Err(error) => Err(handle_remote_error(error)),
        }
    }

    async fn defer(&self, mutation: Mutation, reason: &str) -> Result<WriteOutcome> {
        let table = mutation.table().to_string();
        let id = self.queue.queue_mutation(mutation).await?;
        tracing::warn!(
            mutation_id = %id,
            table = %table,
            "Write deferred to the offline queue ({})",
            reason
        );
        Ok(WriteOutcome::Deferred(id))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// The single row a write returned.
pub(crate) fn single<T: DeserializeOwned>(rows: Vec<Row>, table: &str) -> Result<T> {
    let row = rows.into_iter().next().ok_or_else(|| {
        Error::Api(ApiError::new(format!("No row returned from {table}")).with_code("PGRST116"))
    })?;
    decode(row)
}

/// Serialize a payload into a row, dropping `null` fields.
pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(mut row) => {
            row.retain(|_, value| !value.is_null());
            Ok(row)
        }
        _ => Err(Error::InvalidInput("Payload must be an object".into())),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::StaticSession;
    use crate::connectivity::ConnectivityMonitor;
    use crate::remote::{into_row, MemoryStore};
    use crate::storage::MemoryKeyValueStore;

    type TestClient = VibeClient<MemoryStore, MemoryKeyValueStore, ConnectivityMonitor, StaticSession>;

    fn client(connected: bool) -> TestClient {
        let queue = MutationQueue::new(Arc::new(MemoryKeyValueStore::new()))
            .with_retry_policy(RetryPolicy::none());
        VibeClient::new(
            Arc::new(MemoryStore::new()),
            queue,
            Arc::new(ConnectivityMonitor::new(connected)),
            Arc::new(StaticSession::signed_in("u1")),
        )
    }

    fn mutation() -> Mutation {
        Mutation::upsert(
            "saved_items",
            into_row(json!({ "user_id": "u1", "item_id": "i1" })),
            Some("user_id,item_id"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn writes_directly_when_online() {
        let client = client(true);
        let outcome = client.write_or_defer(mutation()).await.unwrap();

        assert!(matches!(outcome, WriteOutcome::Persisted(rows) if rows.len() == 1));
        assert!(client.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn defers_without_calling_remote_when_offline() {
        let client = client(false);
        let outcome = client.write_or_defer(mutation()).await.unwrap();

        assert!(matches!(outcome, WriteOutcome::Deferred(_)));
        assert_eq!(client.remote().call_count(), 0);
        assert_eq!(client.queue().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn defers_when_network_fails_mid_call() {
        let client = client(true);
        client.remote().set_offline(true);

        let outcome = client.write_or_defer(mutation()).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Deferred(_)));
        assert_eq!(client.queue().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn api_errors_are_classified_not_queued() {
        let client = client(true);
        client.remote().fail_next(
            "saved_items",
            RemoteError::Api {
                status: Some(403),
                body: json!({ "message": "permission denied", "code": "42501" }),
            },
        );

        let error = client.write_or_defer(mutation()).await.unwrap_err();
        assert_eq!(error.user_message(), "permission denied");
        assert!(client.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn signed_out_callers_are_rejected() {
        let client = client(true);
        client.session.set_user(None);
        assert!(matches!(
            client.require_user().await,
            Err(Error::NotAuthenticated)
        ));
    }

    #[test]
    fn to_row_drops_nulls() {
        let row = to_row(&json!({ "a": 1, "b": null })).unwrap();
        assert_eq!(row, into_row(json!({ "a": 1 })));
        assert!(to_row(&json!([1])).is_err());
    }
}
