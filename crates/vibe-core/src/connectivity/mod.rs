//! Network reachability as seen by the client.

mod probe;

use std::future::Future;

use tokio::sync::watch;

pub use probe::ReachabilityProbe;

/// Source of "is connected" state and its transitions.
pub trait Connectivity: Send + Sync {
    /// One-shot fetch of the current state.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Receiver observing every later change; its initial value is the
    /// current state.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity state fed by the platform (or a [`ReachabilityProbe`]).
#[derive(Debug)]
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(connected: bool) -> Self {
        let (sender, _) = watch::channel(connected);
        Self { sender }
    }

    /// Record the latest reachability. Subscribers are only woken when the
    /// value actually changes; returns whether it did.
    pub fn set_connected(&self, connected: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            tracing::info!(connected, "Connectivity changed");
        }
        changed
    }

    pub fn connected(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityMonitor {
    async fn is_connected(&self) -> bool {
        self.connected()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
