//! Business logic services.

pub mod orchestrator;

pub use orchestrator::{JobOrchestrator, JobOutcome};
