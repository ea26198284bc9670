//! Archive download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::debug;

use looplabs_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Stream a finished job's archive.
///
/// Malformed IDs are reported as not found, same as unknown ones.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let not_found = || {
        metrics::record_download(false);
        ApiError::not_found("Zip not found")
    };

    let job_id = JobId::parse(&job_id).map_err(|e| {
        debug!("Rejecting download for malformed job id: {}", e);
        not_found()
    })?;

    let path = state.orchestrator.archive_path(&job_id);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    let meta = file.metadata().await?;
    if !meta.is_file() {
        return Err(not_found());
    }
    let len = meta.len();

    metrics::record_download(true);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", job_id.archive_name()),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
