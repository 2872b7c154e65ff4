use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// Client-visible error outcome with a stable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_request",
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let (status, code) = match &e {
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            DomainError::Indexing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "indexing_error"),
            DomainError::GenerationProvider(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "generation_error")
            }
            DomainError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
            // Recovered inside the core; reaching here is a bug.
            DomainError::NotInitialized => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        Self {
            status,
            code,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }

        (
            self.status,
            Json(ErrorBody {
                error: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}
