//! Error types for vibe-core

use thiserror::Error;

use crate::api_error::ApiError;
use crate::auth::AuthError;

/// Result type alias using vibe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vibe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No active session; never queued
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The write needs connectivity and cannot be replayed safely later
    #[error("This action requires a network connection")]
    Offline,

    /// Classified remote-store error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Identity provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Invalid input the caller must correct
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.message.clone(),
            other => other.to_string(),
        }
    }
}
