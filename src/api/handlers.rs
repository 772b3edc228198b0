//! API Handlers
//!
//! HTTP request handlers for each sidecar endpoint. Handlers are thin: they
//! validate input and translate between DTOs and `OfflineService` calls.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::connectivity::ConnectivityState;
use crate::error::{OfflineError, Result};
use crate::models::{
    AlternativesResponse, CacheRequest, CacheResponse, CachedDataResponse, ConnectivityRequest,
    DoctorUnavailableRequest, HealthResponse, SmsRequest, SmsResponse, StatsResponse,
    StatusResponse,
};
use crate::queue::{ActionIntent, DrainReport, PendingAction};
use crate::resilience::VoiceBooking;
use crate::service::{OfflineService, Redirect};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OfflineService>,
}

impl AppState {
    pub fn new(service: Arc<OfflineService>) -> Self {
        Self { service }
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let service = &state.service;
    Json(StatusResponse {
        connectivity: service.connectivity(),
        pending_actions: service.pending_count().await,
        dead_letters: service.dead_letters().await.len(),
    })
}

/// Handler for PUT /cache
///
/// A write the storage rejects is still served from memory but answered
/// with 507 so the caller knows it will not survive a restart.
pub async fn cache_put_handler(
    State(state): State<AppState>,
    Json(req): Json<CacheRequest>,
) -> Result<Json<CacheResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(OfflineError::InvalidRequest(error_msg));
    }

    state.service.cache_data(&req.key, &req.data).await?;
    Ok(Json(CacheResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CachedDataResponse>> {
    match state.service.get_cached_data(&key).await {
        Some(data) => Ok(Json(CachedDataResponse::new(key, data))),
        None => Err(OfflineError::NotFound(format!(
            "no fresh cached data for '{}'",
            key
        ))),
    }
}

/// Handler for POST /actions
pub async fn queue_action_handler(
    State(state): State<AppState>,
    Json(intent): Json<ActionIntent>,
) -> Result<(StatusCode, Json<PendingAction>)> {
    let action = state.service.queue_action(intent).await?;
    Ok((StatusCode::ACCEPTED, Json(action)))
}

/// Handler for GET /actions
pub async fn pending_actions_handler(State(state): State<AppState>) -> Json<Vec<PendingAction>> {
    Json(state.service.pending_actions().await)
}

/// Handler for GET /actions/dead
pub async fn dead_letters_handler(State(state): State<AppState>) -> Json<Vec<PendingAction>> {
    Json(state.service.dead_letters().await)
}

/// Handler for POST /sync
///
/// Runs a drain in the request. No-op while offline.
pub async fn sync_handler(State(state): State<AppState>) -> Json<DrainReport> {
    Json(state.service.sync_pending().await)
}

/// Handler for POST /connectivity
///
/// Link hints are applied before the online flag so the reported quality
/// already reflects them.
pub async fn connectivity_handler(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<ConnectivityState> {
    let service = &state.service;
    if req.link_type.is_some() {
        service.set_link_hint(req.link_type);
    }
    if let Some(ms) = req.latency_ms {
        service.record_latency(Duration::from_millis(ms));
    }
    service.set_online(req.online);
    Json(service.connectivity())
}

/// Handler for GET /alternatives/:medicine
pub async fn alternatives_handler(
    State(state): State<AppState>,
    Path(medicine): Path<String>,
) -> Json<AlternativesResponse> {
    let alternatives = state.service.suggest_alternatives(&medicine).await;
    Json(AlternativesResponse {
        medicine,
        alternatives,
    })
}

/// Handler for POST /doctors/:id/unavailable
pub async fn doctor_unavailable_handler(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    Json(req): Json<DoctorUnavailableRequest>,
) -> Result<Json<Redirect>> {
    if req.patient_id.trim().is_empty() {
        return Err(OfflineError::InvalidRequest(
            "patientId cannot be empty".to_string(),
        ));
    }

    let service = &state.service;
    match service
        .handle_doctor_unavailable(&doctor_id, &req.patient_id, req.patient_phone.as_deref())
        .await
    {
        Some(redirect) => Ok(Json(redirect)),
        None => Err(OfflineError::NotFound(format!(
            "no alternative doctors available; {}",
            service.helpline_instruction()
        ))),
    }
}

/// Handler for POST /sms
pub async fn sms_handler(
    State(state): State<AppState>,
    Json(req): Json<SmsRequest>,
) -> Json<SmsResponse> {
    let delivered = state.service.send_sms_fallback(&req.phone, &req.message).await;
    Json(SmsResponse { delivered })
}

/// Handler for POST /voice-booking
pub async fn voice_booking_handler(State(state): State<AppState>) -> Json<VoiceBooking> {
    Json(state.service.initiate_voice_booking().await)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.service.cache_stats().await.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn test_state() -> AppState {
        let service = OfflineService::builder(Arc::new(MemoryStorage::new())).build();
        AppState::new(Arc::new(service))
    }

    #[tokio::test]
    async fn test_cache_put_and_get_handler() {
        let state = test_state();

        let req = CacheRequest {
            key: "inventory".to_string(),
            data: json!({"paracetamol": 12}),
        };
        let result = cache_put_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let result = cache_get_handler(State(state), Path("inventory".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.data, json!({"paracetamol": 12}));
    }

    #[tokio::test]
    async fn test_cache_get_missing_key() {
        let state = test_state();

        let result = cache_get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(OfflineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cache_put_invalid_request() {
        let state = test_state();

        let req = CacheRequest {
            key: "".to_string(),
            data: json!(1),
        };
        let result = cache_put_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(OfflineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_queue_action_handler_accepts() {
        let state = test_state();

        let intent = ActionIntent::new("book_appointment", json!({"doctorId": "d1"}));
        let (status, Json(action)) = queue_action_handler(State(state.clone()), Json(intent))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);

        let Json(pending) = pending_actions_handler(State(state)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, action.id);
    }

    #[tokio::test]
    async fn test_connectivity_handler_applies_hint() {
        let state = test_state();

        let req = ConnectivityRequest {
            online: true,
            link_type: Some("3g".to_string()),
            latency_ms: None,
        };
        let Json(connectivity) = connectivity_handler(State(state), Json(req)).await;
        assert!(connectivity.is_online);
        assert_eq!(connectivity.quality.to_string(), "poor");
    }

    #[tokio::test]
    async fn test_doctor_unavailable_without_directory() {
        let state = test_state();

        let req = DoctorUnavailableRequest {
            patient_id: "p1".to_string(),
            patient_phone: None,
        };
        let result =
            doctor_unavailable_handler(State(state), Path("d1".to_string()), Json(req)).await;
        match result {
            Err(OfflineError::NotFound(msg)) => assert!(msg.contains("helpline")),
            other => panic!("expected not found, got {:?}", other.map(|r| r.0)),
        }
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
