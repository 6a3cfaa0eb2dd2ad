use std::sync::Arc;

use vibe_core::connectivity::{ConnectivityMonitor, ReachabilityProbe};
use vibe_core::remote::PostgrestStore;
use vibe_core::storage::LibSqlKeyValueStore;
use vibe_core::{MutationQueue, VibeClient};

use crate::auth::{auth_client, AuthClient};
use crate::config_file::ResolvedConfig;
use crate::error::CliError;

pub type CliQueue = MutationQueue<LibSqlKeyValueStore>;
pub type CliRemote = PostgrestStore<AuthClient>;
pub type CliClient = VibeClient<CliRemote, LibSqlKeyValueStore, ConnectivityMonitor, AuthClient>;

/// A client plus the probe used to seed its connectivity state.
pub struct OpenedClient {
    pub client: CliClient,
    pub probe: ReachabilityProbe,
    pub signed_in: bool,
}

pub async fn open_queue(config: &ResolvedConfig) -> Result<CliQueue, CliError> {
    if let Some(parent) = config.queue_db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = LibSqlKeyValueStore::open(&config.queue_db_path).await?;
    Ok(MutationQueue::new(Arc::new(store)).with_retry_policy(config.client.retry_policy()))
}

/// The PostgREST store, authorized per request by the stored session.
pub fn open_remote(
    config: &ResolvedConfig,
    auth: Arc<AuthClient>,
) -> Result<CliRemote, CliError> {
    let (url, anon_key) = config.client.supabase().map_err(CliError::Config)?;
    PostgrestStore::new(url, anon_key, auth).map_err(CliError::Config)
}

/// Wire the queue, the PostgREST store and the stored session together.
/// Connectivity starts from a single reachability probe.
pub async fn open_client(
    config: &ResolvedConfig,
    probe_url: Option<&str>,
) -> Result<OpenedClient, CliError> {
    let auth = Arc::new(auth_client(&config.client)?);
    let remote = open_remote(config, Arc::clone(&auth))?;
    let signed_in = auth.restore_session().await?.is_some();

    let (supabase_url, _) = config.client.supabase().map_err(CliError::Config)?;
    let probe =
        ReachabilityProbe::new(probe_url.unwrap_or(supabase_url)).map_err(CliError::Config)?;
    let connected = probe.check().await;
    tracing::debug!(connected, url = probe.url(), "Initial reachability");

    let client = VibeClient::new(
        Arc::new(remote),
        open_queue(config).await?,
        Arc::new(ConnectivityMonitor::new(connected)),
        auth,
    );

    Ok(OpenedClient {
        client,
        probe,
        signed_in,
    })
}

/// Like [`open_client`], but fails early when no session is stored.
pub async fn open_signed_in_client(config: &ResolvedConfig) -> Result<CliClient, CliError> {
    let opened = open_client(config, None).await?;
    if !opened.signed_in {
        return Err(CliError::NotSignedIn);
    }
    Ok(opened.client)
}
