//! Video analysis upload handler.

use std::path::Path;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use dfscan_models::AnalysisReport;

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_upload_rejected;
use crate::state::AppState;

/// Video container extensions accepted for upload.
const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// `POST /api/analyze`
///
/// Accepts a multipart upload with a `file` field, runs both detection
/// pipelines, and returns the fused report. The upload lives in a
/// request-scoped temp file that is deleted when the handler returns.
pub async fn analyze_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalysisReport>> {
    let started = Instant::now();

    let (filename, data) = read_upload(&mut multipart).await?;
    validate_extension(&filename)?;

    if data.is_empty() {
        record_upload_rejected("empty_file");
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }

    info!(
        filename = %filename,
        size_bytes = data.len(),
        "Received video for analysis"
    );

    // Request-scoped artifact: deleted when the handle drops, including on
    // every error path below.
    let upload = NamedTempFile::new()
        .map_err(|e| ApiError::internal(format!("Failed to create temp file: {e}")))?;
    tokio::fs::write(upload.path(), &data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to buffer upload: {e}")))?;
    drop(data);

    let result = state.detector.analyze(upload.path(), &filename).await?;

    let processing_time = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
    Ok(Json(AnalysisReport::from_result(&result, processing_time)))
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .ok_or_else(|| ApiError::bad_request("Missing filename on file field"))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        return Ok((filename, data.to_vec()));
    }

    record_upload_rejected("missing_field");
    Err(ApiError::bad_request("Missing 'file' field in upload"))
}

/// Reduce a client-supplied filename to its base name.
fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string())
}

/// Reject uploads whose extension is not a supported video container.
fn validate_extension(filename: &str) -> ApiResult<()> {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        other => {
            warn!(filename = %filename, "Rejected upload with unsupported extension");
            record_upload_rejected("bad_extension");
            Err(ApiError::bad_request(format!(
                "Unsupported file type '{}'; expected one of: {}",
                other.unwrap_or_default(),
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    }
}
