//! Axum REST API handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::engine::InferenceBackend;
use crate::service::{TryOnOutcome, TryOnService};
use crate::storage::ObjectStore;

use super::dto::*;

/// Application state shared across handlers
pub struct AppState<S: ObjectStore, B: InferenceBackend> {
    pub service: Arc<TryOnService<S, B>>,
    pub start_time: Instant,
}

/// Create the REST API router
pub fn create_rest_router<S: ObjectStore, B: InferenceBackend>(
    state: Arc<AppState<S, B>>,
    max_body_bytes: usize,
) -> Router {
    Router::new()
        .route("/try-on", post(try_on_handler::<S, B>))
        // System endpoints
        .route("/health", get(health_handler::<S, B>))
        .route("/metrics", get(metrics_handler::<S, B>))
        // Middleware
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a try-on job
async fn try_on_handler<S: ObjectStore, B: InferenceBackend>(
    State(state): State<Arc<AppState<S, B>>>,
    payload: Result<Json<TryOnRequestDto>, JsonRejection>,
) -> Result<Json<TryOnResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected try-on body: {}", e.body_text());
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&e.body_text(), "INVALID_JSON")))
    })?;

    match state.service.run(request.into()).await {
        TryOnOutcome::Completed { session_id, result_key } => Ok(Json(TryOnResponse {
            session_id,
            result_image_key: result_key,
        })),
        TryOnOutcome::Failed { error, .. } => {
            let status = if error.is_bad_request() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err((status, Json(ErrorResponse::new(&error.to_string(), error.code()))))
        }
    }
}

/// Health check
async fn health_handler<S: ObjectStore, B: InferenceBackend>(
    State(state): State<Arc<AppState<S, B>>>,
) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        status: "ok".to_string(),
        service: health.service,
        backend_name: health.backend_name,
    })
}

/// Metrics
async fn metrics_handler<S: ObjectStore, B: InferenceBackend>(
    State(state): State<Arc<AppState<S, B>>>,
) -> Json<MetricsResponse> {
    let stats = state.service.stats();

    Json(MetricsResponse {
        completed: stats.completed,
        failed: stats.failed,
        backend_connected: state.service.health().backend_connected,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
