use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default = "default_use_retrieval")]
    pub use_retrieval: bool,
}

fn default_use_retrieval() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .chat
        .generate(&request.session_id, &request.message, request.use_retrieval)
        .await?;

    Ok(Json(ChatResponse { response }))
}

/// Streams the response as a plain-text body, one fragment per chunk. A
/// provider failure shows up as a final in-band error fragment, not an HTTP
/// error.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fragments = state
        .chat
        .stream(&request.session_id, &request.message)
        .await?;

    let body = Body::from_stream(
        fragments.map(|fragment| Ok::<_, Infallible>(Bytes::from(fragment))),
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    ))
}
