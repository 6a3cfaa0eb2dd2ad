//! Reconnect-triggered queue flushing.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::connectivity::Connectivity;
use crate::queue::MutationQueue;
use crate::remote::RemoteStore;
use crate::storage::KeyValueStore;

/// Unified sync state for status displays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Error,
}

/// Handle of a running queue-sync listener.
///
/// Dropping the handle leaves the listener running; call
/// [`SyncHandle::cancel`] to detach it.
#[derive(Debug)]
pub struct SyncHandle {
    listener: JoinHandle<()>,
    state: watch::Receiver<SyncState>,
}

impl SyncHandle {
    /// Stop reacting to connectivity changes. A flush that already started
    /// runs to completion.
    pub fn cancel(&self) {
        self.listener.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.listener.is_finished()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }
}

/// Flush `queue` into `remote` every time `connectivity` goes from
/// disconnected to connected. Being connected when the listener starts
/// counts as such a transition.
///
/// Each flush runs in its own task. Flush errors are logged and reflected in
/// the sync state; they never stop the listener. A flush that finishes after
/// the link dropped again leaves the state at [`SyncState::Offline`].
pub fn start_queue_sync<K, R, C>(
    queue: MutationQueue<K>,
    remote: Arc<R>,
    connectivity: &C,
) -> SyncHandle
where
    K: KeyValueStore + 'static,
    R: RemoteStore + 'static,
    C: Connectivity,
{
    let mut updates = connectivity.subscribe();
    let initial = if *updates.borrow() {
        SyncState::Synced
    } else {
        SyncState::Offline
    };
    let (state_tx, state_rx) = watch::channel(initial);
    let state_tx = Arc::new(state_tx);

    let listener = tokio::spawn(async move {
        let mut was_connected = false;
        loop {
            let connected = *updates.borrow_and_update();
            if connected && !was_connected {
                tracing::info!("Connectivity restored, flushing offline queue");
                spawn_flush(
                    queue.clone(),
                    Arc::clone(&remote),
                    Arc::clone(&state_tx),
                    updates.clone(),
                );
            } else if !connected && was_connected {
                state_tx.send_replace(SyncState::Offline);
            }
            was_connected = connected;

            if updates.changed().await.is_err() {
                tracing::debug!("Connectivity source closed, stopping queue sync");
                break;
            }
        }
    });

    SyncHandle {
        listener,
        state: state_rx,
    }
}

fn spawn_flush<K, R>(
    queue: MutationQueue<K>,
    remote: Arc<R>,
    state: Arc<watch::Sender<SyncState>>,
    link: watch::Receiver<bool>,
) where
    K: KeyValueStore + 'static,
    R: RemoteStore + 'static,
{
    tokio::spawn(async move {
        publish(&state, &link, SyncState::Syncing);
        let next = match queue.flush_queue(remote.as_ref()).await {
            Ok(report) if report.is_clean() => SyncState::Synced,
            Ok(report) => {
                tracing::warn!(
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "Offline queue partially flushed; remaining entries wait for the next reconnect"
                );
                SyncState::Error
            }
            Err(error) => {
                tracing::error!("Offline queue flush failed: {}", error);
                SyncState::Error
            }
        };
        publish(&state, &link, next);
    });
}

/// Publish `next`, or `Offline` if the link is down by now. The link is read
/// under the state lock so a concurrent disconnect cannot be overwritten.
fn publish(state: &watch::Sender<SyncState>, link: &watch::Receiver<bool>, next: SyncState) {
    state.send_if_modified(|current| {
        let next = if *link.borrow() {
            next
        } else {
            SyncState::Offline
        };
        let changed = *current != next;
        *current = next;
        changed
    });
}
