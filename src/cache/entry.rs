//! Cache Entry Module
//!
//! Defines the persisted envelope for individual cached resources.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::SCHEMA_VERSION;

// == Cache Envelope ==
/// A cached snapshot as written to the storage substrate:
/// `{ "data": ..., "timestamp": <unix ms>, "version": "1.0" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// The cached payload
    pub data: Value,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Schema tag for forward compatibility
    pub version: String,
}

impl CacheEnvelope {
    // == Constructor ==
    /// Wraps `data` with the current write time and schema version.
    pub fn new(data: Value, now_ms: u64) -> Self {
        Self {
            data,
            timestamp: now_ms,
            version: SCHEMA_VERSION.to_string(),
        }
    }

    /// Age of the entry at `now_ms`. A timestamp in the future counts as
    /// age zero.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl`.
    ///
    /// Boundary condition: an entry is expired once its age is greater than
    /// or equal to the TTL, so it is only served while `age < ttl`.
    pub fn is_expired_at(&self, now_ms: u64, ttl: Duration) -> bool {
        self.age_ms(now_ms) >= ttl.as_millis() as u64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_envelope_wire_format() {
        let envelope = CacheEnvelope::new(json!({"name": "Dr. Rao"}), 1_700_000_000_000);
        let text = serde_json::to_string(&envelope).unwrap();

        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["data"]["name"], "Dr. Rao");
        assert_eq!(parsed["timestamp"], 1_700_000_000_000u64);
        assert_eq!(parsed["version"], "1.0");
    }

    #[test]
    fn test_fresh_entry_not_expired() {
        let envelope = CacheEnvelope::new(json!(1), 1_000);
        assert!(!envelope.is_expired_at(1_000, DAY));
        assert!(!envelope.is_expired_at(1_000 + DAY.as_millis() as u64 - 1, DAY));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let envelope = CacheEnvelope::new(json!(1), 1_000);
        // Entry should be expired once age == ttl
        assert!(envelope.is_expired_at(1_000 + DAY.as_millis() as u64, DAY));
    }

    #[test]
    fn test_future_timestamp_reads_fresh() {
        let envelope = CacheEnvelope::new(json!(1), 5_000);
        assert_eq!(envelope.age_ms(1_000), 0);
        assert!(!envelope.is_expired_at(1_000, DAY));
    }
}
