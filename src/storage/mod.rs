//! Storage Module
//!
//! The persistence substrate under the durable cache and the pending action
//! queue: a flat string key / string value store with synchronous writes.
//!
//! # Backends
//! - [`MemoryStorage`]: in-process map, optional byte quota to simulate a
//!   full substrate
//! - [`FileStorage`]: one file per key under a directory, atomic replace

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

// == Storage Trait ==
/// Synchronous key-value persistence.
///
/// Implementations must make a successful `set` visible to every later `get`
/// on the same instance and, for durable backends, across restarts.
///
/// Calls are made while the cache or queue lock is held, from async code.
/// Backends that block on I/O should hand the worker thread off for the
/// duration (see `FileStorage`).
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Returns the stored value, or `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Lists keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
