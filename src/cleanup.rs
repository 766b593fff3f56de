//! Background sweep job for the replay cache.
//!
//! Expired replay entries are purged lazily whenever a signed request is
//! verified. A process that goes quiet after a burst of traffic would keep
//! those entries around indefinitely, so this job purges them on a timer.

use crate::auth::ReplayCache;
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Purges expired entries from `cache` every `interval`. Never returns;
/// spawn it on the runtime and drop the handle.
pub async fn run_sweep_loop(cache: Arc<ReplayCache>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let removed = cache.purge_expired();
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = cache.len(),
                "Replay cache sweep completed"
            );
        }
    }
}

/// Spawn the sweep loop unless `interval` is zero.
pub fn spawn_sweeper(
    cache: Arc<ReplayCache>,
    interval: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Replay cache sweeper disabled");
        return None;
    }

    Some(tokio::spawn(run_sweep_loop(cache, interval)))
}
