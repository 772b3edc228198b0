//! Telemed Offline - local sidecar serving the offline core over HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telemed_offline::api::{create_router, AppState};
use telemed_offline::queue::{ActionType, Dispatcher, LoggingHandler};
use telemed_offline::storage::FileStorage;
use telemed_offline::{spawn_cache_sweep_task, spawn_sync_task, Config, OfflineService};

/// Main entry point for the offline sidecar.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file-backed store and restore cache and queue
/// 4. Start the reconnect sync task (and cache sweep, if enabled)
/// 5. Serve the HTTP API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemed_offline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Telemed Offline sidecar");

    let config = Config::from_env();
    info!(
        "Configuration loaded: data_dir={}, cache_ttl={}s, retry_max={}, port={}",
        config.data_dir.display(),
        config.cache_ttl,
        config.retry_max,
        config.server_port
    );

    let storage = FileStorage::open(&config.data_dir)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;

    // No upstream services are wired into the sidecar; every known action
    // type is acknowledged and logged.
    let mut dispatcher = Dispatcher::new();
    for action_type in ActionType::known() {
        dispatcher.register(action_type, Arc::new(LoggingHandler));
    }

    let port = config.server_port;
    let sweep_interval = config.cache_sweep_interval;
    let service = Arc::new(
        OfflineService::builder(Arc::new(storage))
            .config(config)
            .dispatcher(dispatcher)
            .build(),
    );
    info!(
        "Offline service ready ({} pending actions)",
        service.pending_count().await
    );

    let sync_handle = spawn_sync_task(service.clone());
    let sweep_handle = if sweep_interval > 0 {
        Some(spawn_cache_sweep_task(service.clone(), sweep_interval))
    } else {
        None
    };

    let app = create_router(AppState::new(service.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    service.shutdown();
    if let Err(e) = sync_handle.await {
        warn!("Sync task ended abnormally: {}", e);
    }
    if let Some(handle) = sweep_handle {
        if let Err(e) = handle.await {
            warn!("Cache sweep task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
