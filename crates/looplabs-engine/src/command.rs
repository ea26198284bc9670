//! Render engine command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn, Instrument};

use crate::error::{EngineError, EngineResult};

/// Builder for a render engine invocation: `<interpreter> <script>`.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    /// Interpreter executable
    interpreter: PathBuf,
    /// Engine entry script
    script: PathBuf,
    /// Working directory of the child
    working_dir: Option<PathBuf>,
    /// Extra environment on top of the inherited one
    envs: Vec<(String, String)>,
}

impl EngineCommand {
    /// Create a new engine command.
    pub fn new(interpreter: impl AsRef<Path>, script: impl AsRef<Path>) -> Self {
        Self {
            interpreter: interpreter.as_ref().to_path_buf(),
            script: script.as_ref().to_path_buf(),
            working_dir: None,
            envs: Vec::new(),
        }
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Human-readable command line for logs and errors.
    pub fn display(&self) -> String {
        format!("{} {}", self.interpreter.display(), self.script.display())
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }
}

/// Captured output of a successful render.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Runs the render engine with a payload on stdin.
///
/// stdout and stderr are drained by separate tasks while the child runs and
/// are both complete before the exit status is inspected.
#[derive(Debug, Clone, Default)]
pub struct EngineRunner {
    /// Optional wall-clock limit
    timeout: Option<Duration>,
}

impl EngineRunner {
    /// Create a runner with no timeout.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill the engine if it runs longer than `limit`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the engine, writing `input` to its stdin and then closing it.
    ///
    /// Returns [`EngineError::RenderFailed`] with the collected output when
    /// the engine exits non-zero.
    pub async fn run(&self, cmd: &EngineCommand, input: &str) -> EngineResult<RenderOutput> {
        debug!("Running render engine: {}", cmd.display());
        let started = Instant::now();

        let mut child = cmd
            .build()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::spawn(cmd.display(), e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::internal("engine stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::internal("engine stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::internal("engine stderr not captured"))?;

        let payload = input.to_owned();
        // spawned tasks inherit the job span
        let writer = tokio::spawn(
            async move {
                stdin.write_all(payload.as_bytes()).await?;
                stdin.shutdown().await
                // dropping stdin closes the pipe
            }
            .in_current_span(),
        );
        let stdout_task = tokio::spawn(drain("stdout", stdout).in_current_span());
        let stderr_task = tokio::spawn(drain("stderr", stderr).in_current_span());

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        "Render engine timed out after {} seconds, killing process",
                        limit.as_secs()
                    );
                    let _ = child.kill().await;
                    // orphaned grandchildren may still hold the pipes open
                    stdout_task.abort();
                    stderr_task.abort();
                    writer.abort();
                    return Err(EngineError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        let stdout = stdout_task.await??;
        let stderr = stderr_task.await??;

        match writer.await? {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Render engine closed stdin before reading the payload");
            }
            Err(e) => warn!("Failed to write payload to render engine: {}", e),
        }

        let elapsed = started.elapsed();

        if status.success() {
            info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Render engine completed"
            );
            Ok(RenderOutput {
                stdout,
                stderr,
                exit_code: status.code(),
                elapsed,
            })
        } else {
            warn!(exit_code = ?status.code(), "Render engine failed");
            Err(EngineError::RenderFailed {
                stderr,
                stdout,
                exit_code: status.code(),
            })
        }
    }
}

/// Read a child stream to the end, logging each line as it arrives.
async fn drain<R>(stream: &'static str, reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        debug!(stream, "engine: {}", String::from_utf8_lossy(&line).trim_end());
        collected.extend_from_slice(&line);
    }

    Ok(String::from_utf8_lossy(&collected).into_owned())
}

/// Resolve the interpreter: paths are kept as-is, bare names are looked up
/// on `PATH`.
pub fn resolve_interpreter(interpreter: &Path) -> EngineResult<PathBuf> {
    if interpreter.components().count() > 1 {
        return Ok(interpreter.to_path_buf());
    }
    which::which(interpreter)
        .map_err(|_| EngineError::InterpreterNotFound(interpreter.display().to_string()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::Layer;

    /// Records the enclosing span name of every engine output event.
    #[derive(Clone, Default)]
    struct StreamSpans(Arc<Mutex<Vec<Option<String>>>>);

    impl<S> Layer<S> for StreamSpans
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            if event.metadata().fields().field("stream").is_none() {
                return;
            }
            let span = ctx.event_span(event).map(|s| s.name().to_string());
            self.0.lock().unwrap().push(span);
        }
    }

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("engine.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_command_display() {
        let cmd = EngineCommand::new("/usr/bin/python3", "/srv/engine/main.py")
            .current_dir("/srv/engine")
            .env("LOOPLABS_JOB_ID", "1");
        assert_eq!(cmd.display(), "/usr/bin/python3 /srv/engine/main.py");
        assert_eq!(cmd.script(), Path::new("/srv/engine/main.py"));
    }

    #[tokio::test]
    async fn test_engine_output_is_logged_in_callers_span() {
        let spans = StreamSpans::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(spans.clone()));

        let dir = TempDir::new().unwrap();
        let path = script(&dir, "cat > /dev/null\necho out\necho err >&2\n");
        let cmd = EngineCommand::new("/bin/sh", &path);

        EngineRunner::new()
            .run(&cmd, "x\n")
            .instrument(tracing::info_span!("job"))
            .await
            .unwrap();

        let seen = spans.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|span| span.as_deref() == Some("job")));
    }

    #[tokio::test]
    async fn test_run_echoes_stdin_and_collects_both_streams() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "read line\necho \"got:$line\"\necho warn >&2\n");
        let cmd = EngineCommand::new("/bin/sh", &path);

        let output = EngineRunner::new().run(&cmd, "hello\n").await.unwrap();
        assert_eq!(output.stdout, "got:hello\n");
        assert_eq!(output.stderr, "warn\n");
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_run_sees_env_and_working_dir() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "cat > /dev/null\necho \"$LOOPLABS_JOB_ID\"\npwd\n");
        let cmd = EngineCommand::new("/bin/sh", &path)
            .current_dir(dir.path())
            .env("LOOPLABS_JOB_ID", "abc");

        let output = EngineRunner::new().run(&cmd, "{}\n").await.unwrap();
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines[0], "abc");
        let cwd = std::fs::canonicalize(lines[1]).unwrap();
        assert_eq!(cwd, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_nonzero_exit_returns_stderr() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "cat > /dev/null\necho 'font not found' >&2\nexit 2\n");
        let cmd = EngineCommand::new("/bin/sh", &path);

        let err = EngineRunner::new().run(&cmd, "{}\n").await.unwrap_err();
        match err {
            EngineError::RenderFailed {
                stderr, exit_code, ..
            } => {
                assert_eq!(stderr, "font not found\n");
                assert_eq!(exit_code, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_engine_ignoring_stdin_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "echo done\n");
        let cmd = EngineCommand::new("/bin/sh", &path);

        let big = "x".repeat(1 << 20);
        let output = EngineRunner::new().run(&cmd, &big).await.unwrap();
        assert_eq!(output.stdout, "done\n");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let cmd = EngineCommand::new("/nonexistent/python3", "main.py");
        let err = EngineRunner::new().run(&cmd, "").await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_engine() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "exec sleep 30\n");
        let cmd = EngineCommand::new("/bin/sh", &path);

        let err = EngineRunner::new()
            .with_timeout(Duration::from_millis(200))
            .run(&cmd, "")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[test]
    fn test_resolve_interpreter() {
        assert_eq!(
            resolve_interpreter(Path::new("/opt/venv/bin/python3")).unwrap(),
            PathBuf::from("/opt/venv/bin/python3")
        );
        assert!(resolve_interpreter(Path::new("sh")).is_ok());
        assert!(matches!(
            resolve_interpreter(Path::new("definitely-not-an-interpreter-xyz")),
            Err(EngineError::InterpreterNotFound(_))
        ));
    }
}
