//! Document loader: PDF bytes to plain text.
//!
//! Read-only. The file is read fully into memory and closed before extraction,
//! so no handle outlives the call.

use std::path::Path;

use tracing::debug;

use crate::matching::error::AnalysisError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Loads the PDF at `path` and returns its per-page text joined by newlines.
pub async fn load_pdf(path: &Path) -> Result<String, AnalysisError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AnalysisError::DocumentRead(format!("{}: {e}", path.display())))?;
    let text = extract_pdf_text(bytes).await?;
    debug!("loaded {} characters from {}", text.chars().count(), path.display());
    Ok(text)
}

/// Extracts text from in-memory PDF bytes.
///
/// The extractor is CPU-bound and panics on some malformed inputs, so it runs on
/// the blocking pool and a panic is reported as `DocumentRead`.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AnalysisError> {
    if !looks_like_pdf(&bytes) {
        return Err(AnalysisError::DocumentRead(
            "file is not a PDF (missing %PDF- header)".to_string(),
        ));
    }

    let pages =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| AnalysisError::DocumentRead(format!("PDF extraction aborted: {e}")))?
            .map_err(|e| AnalysisError::DocumentRead(format!("PDF extraction failed: {e}")))?;
    if pages.is_empty() {
        return Err(AnalysisError::DocumentRead("PDF has no pages".to_string()));
    }

    join_pages(pages.iter().map(String::as_str))
}

/// Leading whitespace is tolerated before the header, as most readers do.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PDF_MAGIC)
}

/// Joins page texts with `\n`; whitespace-only output is `EmptyContent`.
pub fn join_pages<'a>(pages: impl IntoIterator<Item = &'a str>) -> Result<String, AnalysisError> {
    let text = pages.into_iter().collect::<Vec<_>>().join("\n");
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyContent(
            "no text could be extracted (scanned or image-only PDF?)".to_string(),
        ));
    }
    Ok(text)
}
