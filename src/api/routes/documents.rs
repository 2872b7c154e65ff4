use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::infrastructure::pdf;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

/// Uploads and indexes a PDF. Multipart fields: `file` (the PDF) and an
/// optional `clear_existing` boolean.
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<Bytes> = None;
    let mut clear_existing = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                if let Some(content_type) = field.content_type() {
                    if content_type != "application/pdf" {
                        return Err(ApiError::bad_request(
                            "invalid file type, only PDF files are supported",
                        ));
                    }
                }
                file = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            Some("clear_existing") => {
                clear_existing = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?
                    .trim()
                    .parse()
                    .unwrap_or(false);
            }
            _ => {}
        }
    }

    let Some(bytes) = file else {
        return Err(ApiError::bad_request("missing file field"));
    };

    let pages = pdf::extract_pages(&bytes).await?;
    let chunks = state.ingest.index_pages(&pages, clear_existing).await?;

    Ok(Json(UploadResponse {
        message: "PDF document indexed successfully".to_string(),
        chunks,
    }))
}

pub async fn clear_documents(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    state.ingest.clear().await?;
    Ok(Json(ClearResponse {
        message: "vector store cleared successfully".to_string(),
    }))
}
