//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::config::Config;
use crate::game::MatchPhase;
use crate::util::time::uptime_secs;
use crate::ws::handler::{control_ws_handler, peer_ws_handler};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws/peer", get(peer_ws_handler))
        .route("/ws/control", get(control_ws_handler))
        .route("/match/start", post(start_handler))
        .route("/match/exit", post(exit_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Explicit origins when configured, any origin for local play otherwise
fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.client_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE]);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    phase: MatchPhase,
    peer_connected: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        phase: state.session.view().phase,
        peer_connected: state.peer_connected(),
    })
}

// ============================================================================
// Match endpoints
// ============================================================================

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    status: &'static str,
}

async fn start_handler(State(state): State<AppState>) -> Result<Json<AcceptedResponse>, AppError> {
    if !state.session.start().await {
        return Err(AppError::Unavailable);
    }
    Ok(Json(AcceptedResponse { status: "accepted" }))
}

async fn exit_handler(State(state): State<AppState>) -> Result<Json<AcceptedResponse>, AppError> {
    if !state.session.exit().await {
        return Err(AppError::Unavailable);
    }
    Ok(Json(AcceptedResponse { status: "accepted" }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duel session is not running")]
    Unavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::game::MatchSession;
    use crate::gesture::ClassifierConfig;
    use crate::util::time::ManualClock;

    fn app_state() -> (AppState, MatchSession) {
        let config = Config::from_lookup(|_| None).unwrap();
        let (session, handle) =
            MatchSession::new(Arc::new(ManualClock::new(0)), ClassifierConfig::default());
        (AppState::new(config, handle), session)
    }

    #[tokio::test]
    async fn test_health_reports_phase_and_peer() {
        let (state, _session) = app_state();
        assert!(state.claim_peer(uuid::Uuid::new_v4()));

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.phase, MatchPhase::Idle);
        assert!(health.peer_connected);
    }

    #[tokio::test]
    async fn test_start_reaches_session() {
        let (state, session) = app_state();
        let task = tokio::spawn(session.run());
        let mut views = state.session.subscribe();

        assert_ok!(start_handler(State(state.clone())).await);
        views.changed().await.unwrap();
        assert_eq!(views.borrow().phase, MatchPhase::Countdown);

        task.abort();
    }

    #[tokio::test]
    async fn test_start_after_session_stops_is_unavailable() {
        let (state, session) = app_state();
        drop(session);
        let err = assert_err!(start_handler(State(state)).await);
        assert!(matches!(err, AppError::Unavailable));
    }

    #[test]
    fn test_error_status_codes() {
        let response = AppError::Conflict("busy".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = AppError::Unavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
