//! Background Tasks Module
//!
//! # Tasks
//! - Reconnect sync: drains the pending queue whenever connectivity returns
//! - Cache sweep: removes expired cache entries at a configured interval

mod cleanup;
mod sync;

pub use cleanup::spawn_cache_sweep_task;
pub use sync::spawn_sync_task;
