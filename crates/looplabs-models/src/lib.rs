//! Shared data models for the LoopLabs render gateway.
//!
//! This crate provides Serde-serializable types for:
//! - Job identities
//! - Generation requests and the readiness heuristic
//! - Job metadata and the payload handed to the render engine
//! - API response bodies

pub mod job;
pub mod metadata;
pub mod readiness;
pub mod request;
pub mod response;

// Re-export common types
pub use job::{JobId, JobIdError};
pub use metadata::{JobMetadata, RenderPayload};
pub use readiness::{readiness_score, ReadinessWeights, MAX_READINESS};
pub use request::{GenerateRequest, DEFAULT_DURATION_SECS, DEFAULT_PROMPT, DEFAULT_THEME};
pub use response::{ErrorBody, GenerateResponse};
