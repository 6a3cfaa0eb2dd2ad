//! End-to-end behavior of the queue, retry and reconnect flushing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;
use vibe_core::auth::StaticSession;
use vibe_core::connectivity::ConnectivityMonitor;
use vibe_core::models::{AnswerInput, CheckinInput, Mutation, MutationKind};
use vibe_core::remote::{into_row, MemoryStore, RemoteError};
use vibe_core::storage::{KeyValueStore, LibSqlKeyValueStore, MemoryKeyValueStore};
use vibe_core::{with_retry, FlushReport, MutationQueue, RetryPolicy, SyncState, VibeClient, QUEUE_KEY};

fn memory_queue() -> MutationQueue<MemoryKeyValueStore> {
    MutationQueue::new(Arc::new(MemoryKeyValueStore::new())).with_retry_policy(RetryPolicy::none())
}

fn checkin_upsert(date: &str, score: f64) -> Mutation {
    Mutation::upsert(
        "daily_checkins",
        into_row(json!({ "user_id": "u1", "checkin_date": date, "overall_score": score })),
        Some("user_id,checkin_date"),
    )
    .unwrap()
}

#[tokio::test]
async fn queue_lists_every_enqueued_entry_in_order() {
    let queue = memory_queue();
    let mut ids = Vec::new();
    for day in 1..=12 {
        let date = format!("2026-02-{day:02}");
        ids.push(queue.queue_mutation(checkin_upsert(&date, 3.0)).await.unwrap());
    }

    let entries = queue.get_queue().await.unwrap();
    assert_eq!(entries.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), ids);
    assert_eq!(entries[0].table, "daily_checkins");
}

#[tokio::test]
async fn empty_flush_reports_nothing_and_leaves_storage_alone() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let queue = MutationQueue::new(Arc::clone(&store));

    let report = queue.flush_queue(&MemoryStore::new()).await.unwrap();

    assert_eq!(report, FlushReport { succeeded: 0, failed: 0 });
    assert_eq!(store.get_item(QUEUE_KEY).await.unwrap(), None);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn replaying_an_upsert_twice_keeps_one_row() {
    let remote = MemoryStore::new().with_coaching_schema();
    let queue = memory_queue();
    queue
        .queue_mutation(checkin_upsert("2026-03-04", 2.0))
        .await
        .unwrap();
    queue
        .queue_mutation(checkin_upsert("2026-03-04", 4.5))
        .await
        .unwrap();

    let report = queue.flush_queue(&remote).await.unwrap();

    assert_eq!(report, FlushReport { succeeded: 2, failed: 0 });
    let rows = remote.rows("daily_checkins");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["overall_score"], json!(4.5));
}

#[tokio::test(start_paused = true)]
async fn with_retry_gives_up_after_bounded_backoff() {
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let result: Result<(), String> = with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("still failing".to_string()) }
        },
        3,
        Duration::from_millis(100),
    )
    .await;

    assert_eq!(result, Err("still failing".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(started.elapsed(), Duration::from_millis(700));
}

#[tokio::test]
async fn partial_flush_keeps_only_the_failed_entry() {
    let remote = MemoryStore::new();
    let queue = memory_queue();
    queue
        .queue_mutation(Mutation::insert("notes", into_row(json!({ "text": "ok" }))).unwrap())
        .await
        .unwrap();
    let failing = Mutation::insert("votes", into_row(json!({ "vote": "up" }))).unwrap();
    queue.queue_mutation(failing).await.unwrap();
    let second = queue.get_queue().await.unwrap()[1].clone();

    remote.fail_table(
        "votes",
        RemoteError::Api {
            status: Some(403),
            body: json!({ "message": "new row violates row-level security policy" }),
        },
    );
    let report = queue.flush_queue(&remote).await.unwrap();

    assert_eq!(report, FlushReport { succeeded: 1, failed: 1 });
    assert_eq!(queue.get_queue().await.unwrap(), vec![second]);
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_checkin_is_replayed_on_reconnect() {
    let remote = Arc::new(MemoryStore::new().with_coaching_schema());
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let client = VibeClient::new(
        Arc::clone(&remote),
        memory_queue(),
        Arc::clone(&monitor),
        Arc::new(StaticSession::signed_in("u1")),
    );

    let input = CheckinInput {
        answers: (1..=5)
            .map(|index| AnswerInput::new(format!("q{index}"), 3))
            .collect(),
        ..CheckinInput::default()
    };
    let saved = client.save_checkin(input).await.unwrap();

    assert!(saved.is_pending());
    let queued = client.queue().get_queue().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].table, "daily_checkins");
    assert!(matches!(queued[0].kind, MutationKind::Upsert { .. }));

    let handle = client.start_queue_sync();
    let mut states = handle.subscribe_state();
    monitor.set_connected(true);
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == SyncState::Synced),
    )
    .await
    .expect("queue was not flushed")
    .expect("sync state closed");

    assert!(client.queue().is_empty().await.unwrap());
    assert_eq!(remote.rows("daily_checkins").len(), 1);
    handle.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn queue_survives_a_restart_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("queue.db");

    {
        let store = Arc::new(LibSqlKeyValueStore::open(&path).await.unwrap());
        let queue = MutationQueue::new(store);
        queue
            .queue_mutation(checkin_upsert("2026-03-05", 4.0))
            .await
            .unwrap();
    }

    let store = Arc::new(LibSqlKeyValueStore::open(&path).await.unwrap());
    let queue = MutationQueue::new(store).with_retry_policy(RetryPolicy::none());
    assert_eq!(queue.len().await.unwrap(), 1);

    let remote = MemoryStore::new().with_coaching_schema();
    let report = queue.flush_queue(&remote).await.unwrap();
    assert_eq!(report, FlushReport { succeeded: 1, failed: 0 });
    assert!(queue.is_empty().await.unwrap());
}
