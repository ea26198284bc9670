//! Error types for engine operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while rendering or packaging a job.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Failed to start render engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Render engine exited with status {}", describe_exit(.exit_code))]
    RenderFailed {
        stderr: String,
        stdout: String,
        exit_code: Option<i32>,
    },

    #[error("Render engine timed out after {0} seconds")]
    Timeout(u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl EngineError {
    /// Create a spawn failure error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Diagnostic text to show a caller when a render did not succeed.
    ///
    /// For a failed process this is the engine's stderr, falling back to the
    /// error description when the engine printed nothing.
    pub fn diagnostic(&self) -> String {
        match self {
            EngineError::RenderFailed { stderr, .. } if !stderr.trim().is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}
