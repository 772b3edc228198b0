//! Cache Module
//!
//! Durable, TTL-bounded storage of reference data for offline reads.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEnvelope;
pub use stats::CacheStats;
pub use store::DurableCache;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Prefix of cache entries in the storage substrate
pub const CACHE_KEY_PREFIX: &str = "offline_";

/// Schema tag written into every envelope
pub const SCHEMA_VERSION: &str = "1.0";
