//! API response bodies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Successful submit response.
///
/// Paths are absolute and rendered as strings. `video` is empty when the
/// engine finished but no video could be located.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub readiness: u8,
    pub job_id: JobId,
    pub folder: String,
    pub video: String,
    pub zip: String,
    pub metadata: String,
    /// Prompt the engine received
    pub prompt: String,
    pub enriched: bool,
    /// Trimmed engine stdout
    pub log: String,
}

/// Error envelope shared by every failing route.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
