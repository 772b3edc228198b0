//! Cache Sweep Task
//!
//! Background task that periodically drops expired entries from the durable
//! cache. Reads already treat expired entries as absent; the sweep only
//! reclaims storage.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::OfflineService;

/// Spawns the sweep loop. Stops when the service shuts down.
///
/// # Arguments
/// * `service` - Shared offline service
/// * `interval_secs` - Seconds between sweeps; must be non-zero
pub fn spawn_cache_sweep_task(service: Arc<OfflineService>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);
    let shutdown = service.shutdown_token();

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = service.purge_expired_cache().await;
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }

        debug!("Cache sweep task stopped");
    })
}
