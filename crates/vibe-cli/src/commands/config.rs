use std::path::{Path, PathBuf};

use vibe_core::config::ClientConfig;

use crate::cli::ConfigCommands;
use crate::config_file::{default_config_path, load_from_path, save_to_path};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().map_err(CliError::Config)?,
    };

    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            queue_db_path,
        } => {
            let existing = load_from_path(&path).map_err(CliError::Config)?;
            let merged = merge_init(existing, supabase_url, supabase_anon_key, queue_db_path);
            save_to_path(&merged, &path).map_err(CliError::Config)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommands::Show => {
            let effective = load_from_path(&path)
                .map_err(CliError::Config)?
                .with_env_overrides(|key| std::env::var(key).ok());
            println!("{}", serde_json::to_string_pretty(&redacted(effective))?);
        }
    }
    Ok(())
}

/// Explicit values replace stored ones; omitted values keep them.
pub fn merge_init(
    mut existing: ClientConfig,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    queue_db_path: Option<PathBuf>,
) -> ClientConfig {
    if supabase_url.is_some() {
        existing.supabase_url = supabase_url;
    }
    if supabase_anon_key.is_some() {
        existing.supabase_anon_key = supabase_anon_key;
    }
    if queue_db_path.is_some() {
        existing.queue_db_path = queue_db_path;
    }
    existing
}

fn redacted(mut config: ClientConfig) -> ClientConfig {
    if let Some(key) = config.supabase_anon_key.as_mut() {
        let visible: String = key.chars().take(6).collect();
        *key = format!("{visible}...");
    }
    config
}
