use std::sync::Arc;

use vibe_core::models::QueuedMutation;
use vibe_core::FlushReport;

use crate::auth::auth_client;
use crate::cli::QueueCommands;
use crate::commands::common::{open_queue, open_remote};
use crate::config_file::ResolvedConfig;
use crate::error::CliError;

pub async fn run_queue(command: QueueCommands, config: &ResolvedConfig) -> Result<(), CliError> {
    match command {
        QueueCommands::List { json } => {
            let queue = open_queue(config).await?;
            let entries = queue.get_queue().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("Queue is empty.");
            } else {
                for entry in &entries {
                    println!("{}", format_entry(entry));
                }
            }
        }
        QueueCommands::Flush => {
            let queue = open_queue(config).await?;
            let remote = open_remote(config, Arc::new(auth_client(&config.client)?))?;

            let report = queue.flush_queue(&remote).await?;
            println!("{}", format_report(report));
        }
    }
    Ok(())
}

pub fn format_entry(entry: &QueuedMutation) -> String {
    format!(
        "{}  {:<6}  {}  {}",
        entry.id,
        entry.operation(),
        entry.table,
        entry.timestamp
    )
}

pub fn format_report(report: FlushReport) -> String {
    if report.succeeded == 0 && report.failed == 0 {
        "Nothing to flush.".to_string()
    } else {
        format!(
            "Flushed {} mutation(s); {} failed and remain queued.",
            report.succeeded, report.failed
        )
    }
}
