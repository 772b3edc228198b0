//! Request DTOs for the offline sidecar API
//!
//! Defines the structure of incoming HTTP request bodies. Queueing an action
//! takes an `ActionIntent` body directly.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;

/// Request body for PUT /cache
#[derive(Debug, Clone, Deserialize)]
pub struct CacheRequest {
    /// The cache key, without the storage prefix
    pub key: String,
    /// Any JSON value
    pub data: Value,
}

impl CacheRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Request body for POST /connectivity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityRequest {
    pub online: bool,
    /// Link type reported by the host, e.g. "4g" or "wifi"
    #[serde(default)]
    pub link_type: Option<String>,
    /// Latest round-trip sample in milliseconds
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

/// Request body for POST /doctors/:id/unavailable
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUnavailableRequest {
    pub patient_id: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
}

/// Request body for POST /sms
#[derive(Debug, Clone, Deserialize)]
pub struct SmsRequest {
    pub phone: String,
    pub message: String,
}
