//! Periodic task evicting registry entries that have gone silent past
//! their TTL. Runs in its own task for the life of the process.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::registry::Registry;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

pub async fn run(registry: Arc<Registry>, interval: Duration, ttl: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let evicted = registry.sweep(ttl).await;
        for agent_id in evicted {
            info!(%agent_id, "evicted silent agent");
        }
    }
}
