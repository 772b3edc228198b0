//! API Routes
//!
//! Configures the Axum router with all sidecar endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    alternatives_handler, cache_get_handler, cache_put_handler, connectivity_handler,
    dead_letters_handler, doctor_unavailable_handler, health_handler, pending_actions_handler,
    queue_action_handler, sms_handler, stats_handler, status_handler, sync_handler,
    voice_booking_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Liveness
/// - `GET /status` - Connectivity and queue depth
/// - `PUT /cache` - Cache a JSON value
/// - `GET /cache/:key` - Read a fresh cached value
/// - `POST /actions` - Queue an action
/// - `GET /actions` - Pending actions
/// - `GET /actions/dead` - Dead-lettered actions
/// - `POST /sync` - Drain the queue now
/// - `POST /connectivity` - Host connectivity signal
/// - `GET /alternatives/:medicine` - Substitute medicines
/// - `POST /doctors/:id/unavailable` - Redirect a patient
/// - `POST /sms` - Send an SMS through the fallback gateway
/// - `POST /voice-booking` - Voice booking with phone fallback
/// - `GET /stats` - Cache statistics
///
/// # Middleware
/// - CORS: Allows any origin (the sidecar is bound for a local front-end)
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/cache", put(cache_put_handler))
        .route("/cache/:key", get(cache_get_handler))
        .route(
            "/actions",
            post(queue_action_handler).get(pending_actions_handler),
        )
        .route("/actions/dead", get(dead_letters_handler))
        .route("/sync", post(sync_handler))
        .route("/connectivity", post(connectivity_handler))
        .route("/alternatives/:medicine", get(alternatives_handler))
        .route("/doctors/:id/unavailable", post(doctor_unavailable_handler))
        .route("/sms", post(sms_handler))
        .route("/voice-booking", post(voice_booking_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::OfflineService;
    use crate::storage::MemoryStorage;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let service = OfflineService::builder(Arc::new(MemoryStorage::new())).build();
        create_router(AppState::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_put_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"doctors","data":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_get_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_queue_action_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/actions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"type":"update_inventory","payload":{"sku":"p1","qty":3}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
