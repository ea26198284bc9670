//! Job metadata and the render engine payload.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GenerateRequest, JobId};

/// Durable record written once into the job directory as `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    pub job_id: JobId,

    pub created_at: DateTime<Utc>,

    /// Full request after prompt resolution and enrichment
    pub input: GenerateRequest,

    /// Prompt before enrichment
    pub original_prompt: String,

    /// Whether the prompt was rewritten by the enricher
    pub enriched: bool,

    /// Readiness score (0-100)
    pub readiness: u8,

    /// Absolute path the engine is asked to write the video to
    pub expected_output: PathBuf,
}

/// Structured job description, written as `payload.json` in the job directory.
///
/// The engine's stdin only carries the prompt line (see
/// [`RenderPayload::stdin_line`]); engines that want the rest read this file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderPayload {
    pub job_id: JobId,

    /// Effective prompt (enriched, supplied, or the default)
    pub prompt: String,

    /// Same as `prompt`; older engine builds read `text`
    pub text: String,

    pub theme: String,

    pub duration: u32,

    #[serde(default)]
    pub media: Vec<Value>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[serde(default)]
    pub audio: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<Value>,

    /// Where the engine must write the video
    pub output_path: PathBuf,

    /// Job directory, for engines that emit extra artifacts
    pub job_dir: PathBuf,
}

impl RenderPayload {
    /// Build the engine payload for a resolved request.
    pub fn new(
        job_id: JobId,
        request: &GenerateRequest,
        prompt: impl Into<String>,
        job_dir: &Path,
        output_path: &Path,
    ) -> Self {
        let prompt = prompt.into();
        Self {
            job_id,
            text: prompt.clone(),
            prompt,
            theme: request.theme_or_default().to_string(),
            duration: request.duration_or_default(),
            media: request.media.clone().unwrap_or_default(),
            keywords: request.keywords.clone().unwrap_or_default(),
            hashtags: request.hashtags.clone().unwrap_or_default(),
            audio: request.wants_audio(),
            brand: request.brand.clone(),
            output_path: output_path.to_path_buf(),
            job_dir: job_dir.to_path_buf(),
        }
    }

    /// The prompt as a single newline-terminated line for the engine's stdin.
    ///
    /// Line breaks inside the prompt are folded into spaces, so an engine that
    /// reads one line still gets the whole prompt.
    pub fn stdin_line(&self) -> String {
        let mut line = self
            .prompt
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        line
    }
}
