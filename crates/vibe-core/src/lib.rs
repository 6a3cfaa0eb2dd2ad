//! vibe-core - Core library for Vibe Working
//!
//! This crate contains the offline-tolerant write pipeline shared by every
//! Vibe Working client: error classification, bounded retry, the durable
//! mutation queue, reconnect-triggered flushing, and the per-entity
//! services built on top of them.

pub mod api_error;
pub mod auth;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod retry;
pub mod rotation;
pub mod storage;
pub mod sync;
pub mod util;

mod services;
#[cfg(test)]
mod test_http;

pub use api_error::{handle_remote_error, ApiError};
pub use client::{SaveStatus, VibeClient, WriteOutcome};
pub use error::{Error, Result};
pub use queue::{FlushReport, MutationQueue, QUEUE_KEY};
pub use retry::{with_retry, RetryPolicy};
pub use sync::{start_queue_sync, SyncHandle, SyncState};
