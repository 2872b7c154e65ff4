use crate::domain::{DomainError, PageText};

/// Extracts per-page text from raw PDF bytes.
///
/// `pdf_extract` is synchronous, so the parse runs on a blocking thread.
/// Pages are numbered from 1 in document order.
pub async fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, DomainError> {
    let bytes = bytes.to_vec();

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| DomainError::indexing(format!("PDF extraction task failed: {e}")))?
    .map_err(|e| DomainError::indexing(format!("PDF extraction failed: {e}")))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText::new(i as u32 + 1, text))
        .collect())
}
