use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use tempfile::NamedTempFile;
use tracing::info;

use crate::errors::AppError;
use crate::matching::pipeline::{CancelSignal, MatchPipeline};
use crate::matching::result::MatchResult;
use crate::matching::retry::RetryPolicy;
use crate::state::AppState;

/// Where the CV for one request comes from.
enum CvUpload {
    Pdf(Vec<u8>),
    Text(String),
}

#[derive(Default)]
struct AnalyzeForm {
    file: Option<(Option<String>, Vec<u8>)>,
    cv_text: Option<String>,
    jd_text: Option<String>,
}

/// POST /api/analyze
///
/// Multipart fields: `file` (PDF) or `cv_text`, plus `jd_text`.
/// The analysis runs on its own task; if the client disconnects, the run is
/// cancelled at its next stage boundary.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let form = read_form(multipart).await?;

    let jd_text = form
        .jd_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("jd_text is required".to_string()))?;
    let cv = match (form.file, form.cv_text) {
        (Some((filename, bytes)), _) if !bytes.is_empty() => {
            info!(
                "analyze request: file {} ({} bytes)",
                filename.as_deref().unwrap_or("<unnamed>"),
                bytes.len()
            );
            CvUpload::Pdf(bytes)
        }
        (_, Some(text)) if !text.trim().is_empty() => CvUpload::Text(text),
        _ => {
            return Err(AppError::Validation(
                "either a PDF file or cv_text is required".to_string(),
            ))
        }
    };

    let cancel = CancelSignal::new();
    let _cancel_guard = cancel.cancel_on_drop();
    let pipeline = state.pipeline.clone();
    let retry = state.retry;

    let result = tokio::spawn(run_analysis(pipeline, retry, cv, jd_text, cancel))
        .await
        .context("analysis task panicked")??;
    Ok(Json(result))
}

async fn run_analysis(
    pipeline: Arc<MatchPipeline>,
    retry: RetryPolicy,
    cv: CvUpload,
    jd_text: String,
    cancel: CancelSignal,
) -> Result<MatchResult, AppError> {
    let (pipeline, jd, cancel) = (pipeline.as_ref(), jd_text.as_str(), &cancel);
    let result = match cv {
        CvUpload::Pdf(bytes) => {
            // Removed from disk when `upload` drops, on every path.
            let upload = write_upload(&bytes).await?;
            let path = upload.path();
            retry
                .run(move |_| pipeline.analyze(path, jd, cancel))
                .await?
        }
        CvUpload::Text(text) => {
            let text = text.as_str();
            retry
                .run(move |_| pipeline.analyze_text(text, jd, cancel))
                .await?
        }
    };
    Ok(result)
}

async fn write_upload(bytes: &[u8]) -> Result<NamedTempFile, AppError> {
    let upload = tempfile::Builder::new()
        .prefix("cv-upload-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create temporary upload file")?;
    tokio::fs::write(upload.path(), bytes)
        .await
        .context("failed to write temporary upload file")?;
    Ok(upload)
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((filename, bytes.to_vec()));
            }
            Some("cv_text") => form.cv_text = Some(field.text().await.map_err(multipart_error)?),
            Some("jd_text") => form.jd_text = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }
    Ok(form)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("invalid multipart body: {}", err.body_text()))
    }
}
