//! Keep-alive self-ping for hosts that idle out free instances.

use javob_core::config::SelfPingConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimum allowed interval; shorter configured values are clamped.
const MIN_INTERVAL_SECS: u64 = 60;

const PING_TIMEOUT: Duration = Duration::from_secs(8);

pub async fn ping_loop(config: SelfPingConfig) {
    if config.url.is_empty() {
        warn!("self-ping enabled but url is empty; not starting");
        return;
    }

    let interval = config.interval_secs.max(MIN_INTERVAL_SECS);
    info!("self-ping every {interval}s against {}", config.url);
    let client = reqwest::Client::new();

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        match client.get(&config.url).timeout(PING_TIMEOUT).send().await {
            Ok(resp) => debug!("self-ping: {}", resp.status()),
            Err(e) => warn!("self-ping failed: {e}"),
        }
    }
}
