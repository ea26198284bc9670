//! Job submission handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use validator::Validate;

use looplabs_models::{GenerateRequest, GenerateResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Submit a render job and wait for it to finish.
///
/// An empty body is the same as `{}`. The response is sent once the engine
/// has exited and the job directory has been archived.
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<GenerateResponse>> {
    let request = parse_request(&body)?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let outcome = state.orchestrator.submit(request).await?;
    Ok(Json(outcome.into_body()))
}

fn parse_request(body: &[u8]) -> ApiResult<GenerateRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}
