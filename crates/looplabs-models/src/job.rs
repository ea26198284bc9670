//! Job identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Longest job id accepted from the outside.
const MAX_JOB_ID_LEN: usize = 64;

/// Rejected job id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobIdError {
    #[error("job id is empty")]
    Empty,

    #[error("job id exceeds 64 characters")]
    TooLong,

    #[error("job id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Unique identifier for a job.
///
/// Generated ids are UUID v4 strings. Ids parsed from requests are limited to
/// ASCII alphanumerics, `-` and `_`, so they are always safe to embed in a
/// file name under the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an externally supplied id.
    pub fn parse(s: &str) -> Result<Self, JobIdError> {
        if s.is_empty() {
            return Err(JobIdError::Empty);
        }
        if s.len() > MAX_JOB_ID_LEN {
            return Err(JobIdError::TooLong);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(JobIdError::InvalidChar(c));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the job directory under the output root.
    pub fn folder_name(&self) -> String {
        format!("job_{}", self.0)
    }

    /// File name of the job archive, a sibling of the job directory.
    pub fn archive_name(&self) -> String {
        format!("job_{}.zip", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = JobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
