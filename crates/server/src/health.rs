use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use sasha_core::directory::UserDirectory;
use serde::Serialize;

/// Body of the legacy liveness probe.
pub const LIVENESS_BODY: &str = "SASHA";

#[derive(Clone)]
pub struct HealthState {
    pub bot_name: String,
    pub directory: Arc<UserDirectory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub user_directory: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/sasha", get(liveness)).route("/health", get(health)).with_state(state)
}

pub async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// An empty directory only degrades the report; commands still work without it.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let cached = state.directory.len().await;
    let user_directory = if cached > 0 {
        HealthCheck { status: "ready", detail: format!("{cached} users cached") }
    } else {
        HealthCheck { status: "empty", detail: "user directory not loaded".to_string() }
    };

    let payload = HealthResponse {
        status: if cached > 0 { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("{} runtime initialized", state.bot_name),
        },
        user_directory,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
