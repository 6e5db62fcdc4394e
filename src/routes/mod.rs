//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::errors::EngineError;
use crate::protocol::ErrorOut;
use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/trail", post(http::http_create_trail))
        .route("/api/v1/trail", get(http::http_get_trail))
        .route("/api/v1/mission/start", post(http::http_start_mission))
        .route("/api/v1/mission/answer", post(http::http_submit_answer))
        .route("/api/v1/mission/finish", post(http::http_finish_mission))
        .route("/api/v1/mission/resume", get(http::http_resume_mission))
        .route("/api/v1/remediation/stats", get(http::http_remediation_stats))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::TrailNotFound(_)
            | EngineError::RoundNotFound(_)
            | EngineError::MissionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::MissionLocked(_) | EngineError::CatalogExhausted => StatusCode::CONFLICT,
            EngineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::StorageWrite(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorOut { message: self.to_string(), retryable: self.is_retryable() };
        (status, Json(body)).into_response()
    }
}
