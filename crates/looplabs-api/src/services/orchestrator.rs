//! Job orchestration: enrich, render, collect, package.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{warn, Instrument};

use looplabs_engine::{
    archive_directory, collect_video, resolve_interpreter, EngineCommand, EngineError,
    EngineResult, EngineRunner, RenderOutput,
};
use looplabs_enricher::{enrich_or_passthrough, Enrichment, PromptEnricher};
use looplabs_models::{
    readiness_score, GenerateRequest, GenerateResponse, JobId, JobMetadata, RenderPayload,
};

use crate::config::EngineConfig;
use crate::error::ApiResult;
use crate::logging::JobLogger;
use crate::metrics;

/// File name the engine is asked to render to.
pub const VIDEO_FILE_NAME: &str = "video.mp4";
/// Metadata file written into every job directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// Structured render payload handed to the engine by path.
pub const PAYLOAD_FILE_NAME: &str = "payload.json";

/// Environment variables set on the engine process.
pub const ENV_JOB_ID: &str = "LOOPLABS_JOB_ID";
pub const ENV_JOB_DIR: &str = "LOOPLABS_JOB_DIR";
pub const ENV_OUTPUT_PATH: &str = "LOOPLABS_OUTPUT_PATH";
pub const ENV_PAYLOAD_PATH: &str = "LOOPLABS_PAYLOAD_PATH";

/// Result of a job whose render succeeded.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub readiness: u8,
    pub job_dir: PathBuf,
    /// Final video location, if one was found
    pub video: Option<PathBuf>,
    /// Archive location; the file may be absent if packaging failed
    pub archive: PathBuf,
    pub metadata: PathBuf,
    pub prompt: String,
    pub enriched: bool,
    pub log: String,
}

impl JobOutcome {
    pub fn into_body(self) -> GenerateResponse {
        GenerateResponse {
            success: true,
            readiness: self.readiness,
            job_id: self.job_id,
            folder: self.job_dir.display().to_string(),
            video: self
                .video
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            zip: self.archive.display().to_string(),
            metadata: self.metadata.display().to_string(),
            prompt: self.prompt,
            enriched: self.enriched,
            log: self.log,
        }
    }
}

/// Runs submitted jobs end to end.
///
/// Each job owns a fresh `job_<id>` directory under the output root, so
/// concurrent jobs never share files. The optional semaphore bounds how many
/// engine processes run at once; jobs past the limit wait for a slot.
pub struct JobOrchestrator {
    output_root: PathBuf,
    interpreter: PathBuf,
    script: PathBuf,
    working_dir: PathBuf,
    runner: EngineRunner,
    render_slots: Option<Semaphore>,
    enricher: Option<Arc<dyn PromptEnricher>>,
}

impl JobOrchestrator {
    pub fn new(
        output_root: &Path,
        engine: &EngineConfig,
        enricher: Option<Arc<dyn PromptEnricher>>,
    ) -> Self {
        let interpreter = match resolve_interpreter(&engine.interpreter) {
            Ok(path) => path,
            Err(e) => {
                warn!("{}; renders will fail until it is installed", e);
                engine.interpreter.clone()
            }
        };

        let mut runner = EngineRunner::new();
        if let Some(limit) = engine.timeout {
            runner = runner.with_timeout(limit);
        }

        Self {
            output_root: output_root.to_path_buf(),
            interpreter,
            script: engine.script.clone(),
            working_dir: engine.working_dir.clone(),
            runner,
            render_slots: engine.max_concurrent.map(Semaphore::new),
            enricher,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.output_root.join(job_id.folder_name())
    }

    pub fn archive_path(&self, job_id: &JobId) -> PathBuf {
        self.output_root.join(job_id.archive_name())
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }

    /// Run one job: enrich the prompt, render, collect the video, archive.
    ///
    /// Only a failed render fails the job. A missing video or a packaging
    /// error is logged and the job still succeeds.
    pub async fn submit(&self, request: GenerateRequest) -> ApiResult<JobOutcome> {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "generate");
        let span = logger.create_span();
        self.run_job(job_id, &logger, request).instrument(span).await
    }

    async fn run_job(
        &self,
        job_id: JobId,
        logger: &JobLogger,
        mut request: GenerateRequest,
    ) -> ApiResult<JobOutcome> {
        metrics::record_job_submitted();

        let original_prompt = request.effective_prompt().to_string();
        let enrichment = self.enrich(&request).await;
        if enrichment.enriched {
            request.prompt = Some(enrichment.prompt.clone());
        }
        let readiness = readiness_score(&request);
        logger.log_start(&format!(
            "readiness {}, enriched {}",
            readiness, enrichment.enriched
        ));

        let job_dir = self.job_dir(&job_id);
        fs::create_dir_all(&self.output_root).await?;
        // A fresh id never collides, so an existing directory is an error
        fs::create_dir(&job_dir).await?;

        let expected_output = job_dir.join(VIDEO_FILE_NAME);
        let metadata_path = job_dir.join(METADATA_FILE_NAME);
        let metadata = JobMetadata {
            job_id: job_id.clone(),
            created_at: Utc::now(),
            input: request.clone(),
            original_prompt,
            enriched: enrichment.enriched,
            readiness,
            expected_output: expected_output.clone(),
        };
        fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?).await?;

        let payload = RenderPayload::new(
            job_id.clone(),
            &request,
            enrichment.prompt.clone(),
            &job_dir,
            &expected_output,
        );
        let payload_path = job_dir.join(PAYLOAD_FILE_NAME);
        fs::write(&payload_path, serde_json::to_vec_pretty(&payload)?).await?;

        let output = match self
            .render(&job_id, &job_dir, &payload_path, &payload)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                logger.log_error(&e.to_string());
                metrics::record_job_failed(failure_reason(&e));
                return Err(e.into());
            }
        };
        metrics::record_render_duration(output.elapsed.as_secs_f64());
        logger.log_progress(&format!(
            "render finished in {:.1}s",
            output.elapsed.as_secs_f64()
        ));

        let video = match collect_video(&expected_output, &job_dir, &output.stdout).await {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                logger.log_warning("render engine exited cleanly but no video was found");
                None
            }
            Err(e) => {
                logger.log_warning(&format!("could not collect rendered video: {}", e));
                None
            }
        };

        let archive = self.archive_path(&job_id);
        match archive_directory(&job_dir, &archive).await {
            Ok(summary) => logger.log_progress(&format!(
                "archived {} files ({} bytes)",
                summary.entries, summary.bytes
            )),
            Err(e) => {
                logger.log_error(&format!("failed to archive job directory: {}", e));
                metrics::record_archive_failure();
            }
        }

        metrics::record_job_completed(video.is_some());
        logger.log_completion(&job_dir.display().to_string());

        Ok(JobOutcome {
            job_id,
            readiness,
            job_dir,
            video,
            archive,
            metadata: metadata_path,
            prompt: enrichment.prompt,
            enriched: enrichment.enriched,
            log: output.stdout.trim().to_string(),
        })
    }

    /// Enrich only caller-supplied prompts, and only when an enricher exists.
    async fn enrich(&self, request: &GenerateRequest) -> Enrichment {
        match (request.supplied_prompt(), &self.enricher) {
            (Some(prompt), Some(enricher)) => {
                let result = enrich_or_passthrough(enricher.as_ref(), prompt).await;
                metrics::record_enrichment(if result.enriched { "enriched" } else { "fallback" });
                result
            }
            _ => Enrichment {
                prompt: request.effective_prompt().to_string(),
                enriched: false,
                error: None,
            },
        }
    }

    /// Run the engine. stdin carries only the prompt line, the way the engine
    /// reads it; everything else is in the payload file.
    async fn render(
        &self,
        job_id: &JobId,
        job_dir: &Path,
        payload_path: &Path,
        payload: &RenderPayload,
    ) -> EngineResult<RenderOutput> {
        let command = EngineCommand::new(&self.interpreter, &self.script)
            .current_dir(&self.working_dir)
            .env(ENV_JOB_ID, job_id.as_str())
            .env(ENV_JOB_DIR, job_dir.display().to_string())
            .env(ENV_OUTPUT_PATH, payload.output_path.display().to_string())
            .env(ENV_PAYLOAD_PATH, payload_path.display().to_string());

        let _permit = match &self.render_slots {
            Some(slots) => Some(
                slots
                    .acquire()
                    .await
                    .map_err(|e| EngineError::internal(e.to_string()))?,
            ),
            None => None,
        };

        self.runner.run(&command, &payload.stdin_line()).await
    }

    /// Whether the output root exists and is writable.
    pub async fn check_output_root(&self) -> Result<(), String> {
        let meta = fs::metadata(&self.output_root)
            .await
            .map_err(|e| format!("{}: {}", self.output_root.display(), e))?;
        if !meta.is_dir() {
            return Err(format!("{} is not a directory", self.output_root.display()));
        }
        if meta.permissions().readonly() {
            return Err(format!("{} is read-only", self.output_root.display()));
        }
        Ok(())
    }

    /// Whether the interpreter and engine script are present.
    pub async fn check_engine(&self) -> Result<(), String> {
        if !is_file(&self.interpreter).await {
            return Err(format!("interpreter {} not found", self.interpreter.display()));
        }
        if !is_file(&self.script).await {
            return Err(format!("engine script {} not found", self.script.display()));
        }
        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

fn failure_reason(err: &EngineError) -> &'static str {
    match err {
        EngineError::RenderFailed { .. } => "exit_status",
        EngineError::Timeout(_) => "timeout",
        EngineError::Spawn { .. } | EngineError::InterpreterNotFound(_) => "spawn",
        _ => "internal",
    }
}
