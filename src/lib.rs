//! Telemed Offline - offline resilience core for a low-connectivity
//! telemedicine client
//!
//! Keeps the app usable without a network: a durable 24-hour cache of
//! reference data, a durable queue of user actions replayed on reconnect,
//! and fallbacks (retry, SMS, doctor redirect, alternative medicines, voice
//! booking) for when the primary path fails.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod queue;
pub mod resilience;
pub mod service;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{OfflineError, Result};
pub use service::{OfflineService, OfflineServiceBuilder, Redirect};
pub use tasks::{spawn_cache_sweep_task, spawn_sync_task};
