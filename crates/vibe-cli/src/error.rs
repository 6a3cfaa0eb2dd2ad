use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] vibe_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Invalid answer '{0}': expected QUESTION_ID=VALUE with VALUE between 1 and 5")]
    InvalidAnswer(String),
    #[error("Not signed in. Run `vibe auth login` first.")]
    NotSignedIn,
}

impl From<vibe_core::auth::AuthError> for CliError {
    fn from(error: vibe_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
