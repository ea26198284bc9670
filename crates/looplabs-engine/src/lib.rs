//! Render engine integration.
//!
//! This crate provides:
//! - A builder for the render engine command line
//! - A runner that feeds the job payload on stdin and collects stdout/stderr
//! - Discovery and relocation of the rendered video
//! - Zip packaging of a job directory

pub mod archive;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod output;

pub use archive::{archive_directory, ArchiveSummary};
pub use command::{resolve_interpreter, EngineCommand, EngineRunner, RenderOutput};
pub use error::{EngineError, EngineResult};
pub use fs_utils::move_file;
pub use output::{collect_video, reported_video_paths, VIDEO_EXTENSIONS};
