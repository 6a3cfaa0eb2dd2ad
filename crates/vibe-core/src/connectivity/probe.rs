//! Active reachability checks for hosts without platform notifications.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;

use super::ConnectivityMonitor;
use crate::util::is_http_url;

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Polls an HTTP endpoint; any response, even an error status, counts as
/// reachable.
#[derive(Clone)]
pub struct ReachabilityProbe {
    client: Client,
    url: String,
}

impl ReachabilityProbe {
    pub fn new(url: impl Into<String>) -> Result<Self, String> {
        let url = url.into().trim().to_string();
        if !is_http_url(&url) {
            return Err("Probe URL must include http:// or https://".to_string());
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(|error| format!("failed to build probe client: {error}"))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Reachability probe failed: {}", error);
                false
            }
        }
    }

    /// Probe every `interval` and publish the result to `monitor` until the
    /// returned task is aborted.
    pub fn spawn(self, monitor: Arc<ConnectivityMonitor>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reachable = self.check().await;
                monitor.set_connected(reachable);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        assert!(ReachabilityProbe::new("example.com").is_err());
        assert!(ReachabilityProbe::new(" https://example.com ").is_ok());
    }
}
