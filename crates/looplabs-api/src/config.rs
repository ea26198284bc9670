//! API configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use looplabs_enricher::EnricherConfig;

/// Where and how the render engine runs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interpreter executable (path, or a bare name looked up on PATH)
    pub interpreter: PathBuf,
    /// Engine entry script
    pub script: PathBuf,
    /// Working directory for the engine process
    pub working_dir: PathBuf,
    /// Kill renders running longer than this
    pub timeout: Option<Duration>,
    /// Maximum engine processes alive at once
    pub max_concurrent: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            script: PathBuf::from("../engine/main.py"),
            working_dir: PathBuf::from("../engine"),
            timeout: None,
            max_concurrent: None,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interpreter: std::env::var("ENGINE_PYTHON")
                .map(PathBuf::from)
                .unwrap_or(defaults.interpreter),
            script: std::env::var("ENGINE_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.script),
            working_dir: std::env::var("ENGINE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.working_dir),
            timeout: std::env::var("RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_concurrent: std::env::var("MAX_CONCURRENT_RENDERS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Root directory for job folders and archives
    pub output_root: PathBuf,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
    pub engine: EngineConfig,
    pub enricher: EnricherConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            output_root: PathBuf::from("output"),
            metrics_enabled: true,
            engine: EngineConfig::default(),
            enricher: EnricherConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            output_root: std::env::var("OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            engine: EngineConfig::from_env(),
            enricher: EnricherConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }

    /// Make every relative filesystem path absolute against `base`.
    ///
    /// Job paths handed to the engine must not depend on the engine's own
    /// working directory. A bare interpreter name is left for PATH lookup.
    pub fn absolutize(mut self, base: &Path) -> Self {
        self.output_root = absolute(base, &self.output_root);
        self.engine.script = absolute(base, &self.engine.script);
        self.engine.working_dir = absolute(base, &self.engine.working_dir);
        if self.engine.interpreter.components().count() > 1 {
            self.engine.interpreter = absolute(base, &self.engine.interpreter);
        }
        self
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Whether an `ENVIRONMENT` value names production, ignoring case and padding.
pub fn is_production_env(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("production")
}
