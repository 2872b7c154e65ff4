use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::domain::Message;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub new_session_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub role: &'static str,
    pub content: String,
    pub timestamp: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content,
            timestamp: message.timestamp.to_rfc3339(),
        }
    }
}

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session_id = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id })))
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.sessions.list().await?))
}

pub async fn rename_session(
    State(state): State<AppState>,
    Path(old_session_id): Path<String>,
    Json(request): Json<RenameSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    state
        .sessions
        .rename(&old_session_id, &request.new_session_id)
        .await?;

    Ok(Json(SessionResponse {
        session_id: request.new_session_id,
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.delete(&session_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::from(crate::domain::DomainError::not_found(
            format!("session {session_id}"),
        )))
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let history = state.sessions.history(&session_id).await?;
    Ok(Json(history.into_iter().map(MessageResponse::from).collect()))
}
