//! Persistent CLI config: `ClientConfig` as JSON in the platform config dir.

use std::path::{Path, PathBuf};

use vibe_core::config::ClientConfig;

const CONFIG_FILE_NAME: &str = "config.json";
const QUEUE_DB_FILE_NAME: &str = "queue.db";
const APP_DIR: &str = "vibe";

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_queue_db_path() -> Result<PathBuf, String> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR).join(QUEUE_DB_FILE_NAME))
        .ok_or_else(|| "Failed to resolve local data directory".to_string())
}

/// Config from `path` (missing file means defaults), without env overrides.
pub fn load_from_path(path: &Path) -> Result<ClientConfig, String> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
    ClientConfig::parse(&raw)
        .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))
}

pub fn save_to_path(config: &ClientConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }

    let normalized = config.clone().normalized()?;
    let serialized = serde_json::to_string_pretty(&normalized)
        .map_err(|error| format!("Failed to serialize config: {error}"))?;
    std::fs::write(path, serialized)
        .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
}

/// Effective settings for a command run.
pub struct ResolvedConfig {
    pub client: ClientConfig,
    pub queue_db_path: PathBuf,
}

/// File config, then `VIBE_*` environment overrides, then CLI flags.
pub fn resolve(
    config_path: Option<&Path>,
    db_path_override: Option<&Path>,
) -> Result<ResolvedConfig, String> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    let client = load_from_path(&path)?
        .with_env_overrides(|key| std::env::var(key).ok())
        .normalized()?;

    let queue_db_path = match (db_path_override, client.queue_db_path.as_ref()) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => path.clone(),
        (None, None) => default_queue_db_path()?,
    };

    Ok(ResolvedConfig {
        client,
        queue_db_path,
    })
}
