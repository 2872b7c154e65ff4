use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::domain::ports::ConversationStore as _;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub conversation_store: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let store_status = match state.store.list().await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let response = ReadinessResponse {
        status: if store_status == "connected" {
            "ready"
        } else {
            "not_ready"
        }
        .into(),
        conversation_store: store_status.into(),
    };

    if store_status == "connected" {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
