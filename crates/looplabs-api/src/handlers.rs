//! HTTP handlers.

pub mod download;
pub mod generate;
pub mod health;

pub use download::download;
pub use generate::generate;
pub use health::{health, ready};
