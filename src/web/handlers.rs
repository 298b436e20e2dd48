//! HTTP request handlers.

use super::AppState;
use crate::actions::{ActionError, ActionKind, ActionOutcome};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Read surface
// ============================================================================

pub async fn handle_view(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.view())
}

pub async fn handle_activity(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.activity().entries().collect::<Vec<_>>())
}

pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.metrics().snapshot())
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Map a settled action onto an HTTP reply.
pub fn outcome_response(kind: ActionKind, outcome: ActionOutcome) -> Response {
    let (status, message) = match &outcome {
        ActionOutcome::Succeeded => (StatusCode::OK, None),
        ActionOutcome::Failed(e @ ActionError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, Some(kind.describe_failure(e)))
        }
        ActionOutcome::Failed(e) => (StatusCode::BAD_GATEWAY, Some(kind.describe_failure(e))),
        ActionOutcome::Busy => (StatusCode::CONFLICT, Some("action already in progress".to_string())),
        ActionOutcome::Unavailable => (StatusCode::CONFLICT, Some("action not available".to_string())),
    };

    (
        status,
        Json(ActionResponse {
            success: outcome.is_success(),
            message,
        }),
    )
        .into_response()
}

fn default_server() -> String {
    "auto".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    #[serde(default)]
    pub service: String,
    #[serde(default = "default_server")]
    pub server: String,
}

pub async fn handle_connect(
    State(state): State<AppState>,
    Json(body): Json<ConnectBody>,
) -> Response {
    let outcome = state.dashboard.actions().connect(&body.service, &body.server).await;
    outcome_response(ActionKind::Connect, outcome)
}

pub async fn handle_disconnect(State(state): State<AppState>) -> Response {
    let outcome = state.dashboard.actions().disconnect().await;
    outcome_response(ActionKind::Disconnect, outcome)
}

pub async fn handle_rotate(State(state): State<AppState>) -> Response {
    let outcome = state.dashboard.actions().rotate().await;
    outcome_response(ActionKind::Rotate, outcome)
}

pub async fn handle_speed_test(State(state): State<AppState>) -> Response {
    let outcome = state.dashboard.actions().speed_test().await;
    outcome_response(ActionKind::SpeedTest, outcome)
}

#[derive(Debug, Deserialize)]
pub struct AutoRotationBody {
    pub enabled: bool,
    #[serde(default)]
    pub interval: Option<u32>,
}

pub async fn handle_auto_rotation(
    State(state): State<AppState>,
    Json(body): Json<AutoRotationBody>,
) -> Response {
    let interval = body.interval.or(Some(state.config.auto_rotation_minutes));
    let outcome = state.dashboard.actions().toggle_auto_rotation(body.enabled, interval);
    outcome_response(ActionKind::ToggleAutoRotation, outcome)
}
