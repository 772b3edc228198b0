//! Response DTOs for the offline sidecar API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::connectivity::ConnectivityState;
use crate::resilience::Alternative;

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct CachedDataResponse {
    pub key: String,
    pub data: Value,
}

impl CachedDataResponse {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheResponse {
    /// Success message
    pub message: String,
    /// The key that was cached
    pub key: String,
}

impl CacheResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached", key),
            key,
        }
    }
}

/// Response body for GET /status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub connectivity: ConnectivityState,
    pub pending_actions: usize,
    pub dead_letters: usize,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub write_failures: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            write_failures: stats.write_failures,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for GET /alternatives/:medicine
#[derive(Debug, Clone, Serialize)]
pub struct AlternativesResponse {
    pub medicine: String,
    pub alternatives: Vec<Alternative>,
}

/// Response body for POST /sms
#[derive(Debug, Clone, Serialize)]
pub struct SmsResponse {
    pub delivered: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::NetworkQuality;
    use serde_json::json;

    #[test]
    fn test_cache_response_serialize() {
        let resp = CacheResponse::new("doctors");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("doctors"));
        assert!(json.contains("cached"));
    }

    #[test]
    fn test_status_response_flattens_connectivity() {
        let resp = StatusResponse {
            connectivity: ConnectivityState {
                is_online: false,
                quality: NetworkQuality::Offline,
            },
            pending_actions: 2,
            dead_letters: 0,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["isOnline"], json!(false));
        assert_eq!(value["quality"], json!("offline"));
        assert_eq!(value["pendingActions"], json!(2));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::new());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
