//! Reconnect Sync Task
//!
//! Watches connectivity and drains the pending queue every time the device
//! comes back online.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::service::OfflineService;

/// Spawns the watcher. A drain also runs at startup if the device is
/// already online, so actions left over from a previous run are replayed.
pub fn spawn_sync_task(service: Arc<OfflineService>) -> JoinHandle<()> {
    let mut online = service.subscribe_connectivity();
    let shutdown = service.shutdown_token();

    tokio::spawn(async move {
        info!("Starting reconnect sync task");

        if *online.borrow_and_update() {
            start_drain(&service);
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = online.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity monitor dropped, stopping sync task");
                        break;
                    }
                    if *online.borrow_and_update() {
                        info!("Connection restored, syncing pending actions");
                        start_drain(&service);
                    } else {
                        debug!("Connection lost, pending actions stay queued");
                        service.cancel_sync();
                    }
                }
            }
        }

        debug!("Reconnect sync task stopped");
    })
}

fn start_drain(service: &Arc<OfflineService>) {
    let service = service.clone();
    tokio::spawn(async move {
        let report = service.sync_pending().await;
        if report.is_clean() {
            debug!("Sync finished: {:?}", report);
        } else {
            warn!("Sync finished with leftovers: {:?}", report);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::queue::{ActionIntent, ActionType, Dispatcher, LoggingHandler};
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::time::Duration;

    fn offline_service() -> Arc<OfflineService> {
        let dispatcher =
            Dispatcher::new().with_handler(ActionType::UpdateInventory, Arc::new(LoggingHandler));
        let config = Config {
            start_online: false,
            ..Config::default()
        };
        Arc::new(
            OfflineService::builder(Arc::new(MemoryStorage::new()))
                .config(config)
                .dispatcher(dispatcher)
                .build(),
        )
    }

    async fn wait_for_empty_queue(service: &OfflineService) -> bool {
        for _ in 0..200 {
            if service.pending_count().await == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_reconnect_drains_queue() {
        let service = offline_service();
        service
            .queue_action(ActionIntent::new(ActionType::UpdateInventory, json!({"sku": "p1"})))
            .await
            .unwrap();

        let handle = spawn_sync_task(service.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.pending_count().await, 1);

        service.set_online(true);
        assert!(wait_for_empty_queue(&service).await);

        service.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let service = offline_service();
        let handle = spawn_sync_task(service.clone());

        service.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sync task should stop")
            .unwrap();
    }
}
