//! Fire-and-forget metrics via the StatHat EZ API.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

const STATHAT_EZ_URL: &str = "https://api.stathat.com/ez";

/// Heartbeat interval for the liveness stat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Metrics sink capability, injected into each component at construction.
/// Emission must never block the reconciliation loop.
pub trait Metrics: Send + Sync {
    /// Record `value` against the named stat. Best-effort; failures are not
    /// reported to the caller.
    fn count(&self, stat: &'static str, value: f64);
}

/// StatHat EZ sink. Each count is posted from a spawned task so a slow or
/// unreachable sink never stalls the caller.
pub struct StatHat {
    client: reqwest::Client,
    ezkey: String,
}

impl StatHat {
    pub fn new(ezkey: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            ezkey,
        }
    }
}

impl Metrics for StatHat {
    fn count(&self, stat: &'static str, value: f64) {
        let client = self.client.clone();
        let ezkey = self.ezkey.clone();
        tokio::spawn(async move {
            let params = [
                ("ezkey", ezkey),
                ("stat", stat.to_string()),
                ("count", value.to_string()),
            ];
            match client.post(STATHAT_EZ_URL).form(&params).send().await {
                Ok(_) => debug!("posted stat {stat}"),
                Err(e) => debug!("stat post for {stat} failed: {e}"),
            }
        });
    }
}

/// Sink used when no StatHat key is configured.
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn count(&self, _stat: &'static str, _value: f64) {}
}

/// Emit the liveness stat immediately and then once per minute, independent
/// of the main loop.
pub fn spawn_heartbeat(metrics: Arc<dyn Metrics>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            tick.tick().await;
            metrics.count("bot_heartbeat", 1.0);
        }
    });
}
