//! HTTP gateway for the LoopLabs render engine.
//!
//! This crate provides:
//! - `POST /generate`: enrich the prompt, run the engine, archive the job
//! - `GET /download/:job_id`: stream a job's archive
//! - Health, readiness and Prometheus endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, EngineConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{JobOrchestrator, JobOutcome};
pub use state::AppState;
