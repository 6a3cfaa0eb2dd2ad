use std::sync::Arc;

use vibe_core::SyncState;

use crate::commands::common::open_client;
use crate::config_file::ResolvedConfig;
use crate::error::CliError;

pub async fn run_watch(probe_url: Option<&str>, config: &ResolvedConfig) -> Result<(), CliError> {
    let opened = open_client(config, probe_url).await?;
    let client = opened.client;
    let interval = config.client.probe_interval();
    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        opened.probe.url(),
        interval.as_secs()
    );

    let probe_task = opened
        .probe
        .spawn(Arc::clone(client.connectivity()), interval);
    let handle = client.start_queue_sync();
    let mut states = handle.subscribe_state();
    println!("{}", describe_state(*states.borrow_and_update()));

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::from),
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                println!("{}", describe_state(*states.borrow_and_update()));
            }
        }
    };

    handle.cancel();
    probe_task.abort();
    let pending = client.queue().len().await?;
    println!("Stopped; {pending} mutation(s) still queued.");
    result
}

pub const fn describe_state(state: SyncState) -> &'static str {
    match state {
        SyncState::Offline => "offline",
        SyncState::Syncing => "syncing",
        SyncState::Synced => "synced",
        SyncState::Error => "sync error (will retry on next reconnect)",
    }
}
