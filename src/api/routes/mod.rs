pub mod chat;
pub mod documents;
pub mod health;
pub mod sessions;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat_handler))
        .route("/chat/stream", post(chat::chat_stream_handler))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{old_session_id}", put(sessions::rename_session))
        .route("/sessions/{session_id}", delete(sessions::delete_session))
        .route("/history/{session_id}", get(sessions::get_history))
        .route("/documents", post(documents::upload_pdf))
        .route("/documents", delete(documents::clear_documents))
}
