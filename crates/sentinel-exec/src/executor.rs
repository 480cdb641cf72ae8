//! Process spawning, output capture, and the hard timeout.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command as ProcessCommand;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sentinel_core::{Command, shell};

/// Default per-command timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configurable timeout bounds.
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 300;

/// How long to wait for output readers to drain after process exit.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Captured output of a finished (or killed) command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
}

/// Errors surfaced by the executor.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The timeout elapsed and the process was killed.
    #[error("command timed out after {timeout_secs}s")]
    Timeout {
        /// The configured timeout that elapsed.
        timeout_secs: u64,
        /// Output captured before the kill.
        partial: ExecOutput,
    },

    /// Nothing to execute.
    #[error("empty command")]
    Empty,

    /// The process could not be spawned.
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O failure while waiting on the process.
    #[error("I/O error during execution: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for execution.
pub type ExecResult<T> = Result<T, ExecError>;

/// Runs approved commands under a hard timeout.
///
/// Commands containing shell control operators run under `sh -c` so their
/// pipelines and chaining keep their meaning; plain commands are tokenized
/// and executed directly, without a shell in between.
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl Executor {
    /// Create an executor with the given per-command timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create an executor from a timeout in seconds, clamped to the
    /// supported 1–300 s range.
    #[must_use]
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(
            secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
        ))
    }

    /// The configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute the raw command text.
    ///
    /// # Errors
    ///
    /// [`ExecError::Empty`] for a blank command, [`ExecError::Spawn`] when
    /// the process cannot start, and [`ExecError::Timeout`] when the
    /// deadline passes, with partial output attached.
    pub async fn execute(&self, command: &Command) -> ExecResult<ExecOutput> {
        let raw = command.as_str();
        if command.is_blank() {
            return Err(ExecError::Empty);
        }

        let mut process = if shell::has_control_operators(raw) {
            let mut p = ProcessCommand::new("sh");
            p.arg("-c").arg(raw);
            p
        } else {
            let words = shell::split(raw);
            let (program, args) = words.split_first().ok_or(ExecError::Empty)?;
            let mut p = ProcessCommand::new(program);
            p.args(args);
            p
        };

        process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = raw, timeout_secs = self.timeout.as_secs(), "spawning command");
        let mut child = process.spawn().map_err(ExecError::Spawn)?;

        let (stdout_task, stdout_buf) = drain(child.stdout.take());
        let (stderr_task, stderr_buf) = drain(child.stderr.take());

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                // Let the readers pull whatever is still buffered in the
                // pipes; a grandchild holding the pipe open must not stall
                // the result.
                let _ = tokio::time::timeout(DRAIN_GRACE, stdout_task).await;
                let _ = tokio::time::timeout(DRAIN_GRACE, stderr_task).await;
                Ok(ExecOutput {
                    stdout: take_buf(&stdout_buf),
                    stderr: take_buf(&stderr_buf),
                    exit_code: status.code(),
                })
            },
            Ok(Err(e)) => Err(ExecError::Io(e)),
            Err(_) => {
                warn!(command = raw, timeout_secs = self.timeout.as_secs(), "command timed out, killing");
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "failed to kill timed-out command");
                }
                let _ = child.wait().await;
                stdout_task.abort();
                stderr_task.abort();
                Err(ExecError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                    partial: ExecOutput {
                        stdout: take_buf(&stdout_buf),
                        stderr: take_buf(&stderr_buf),
                        exit_code: None,
                    },
                })
            },
        }
    }
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

/// Read a pipe to EOF in the background, accumulating into a shared buffer
/// so partial output survives a kill.
fn drain<R>(reader: Option<R>) -> (JoinHandle<()>, SharedBuf)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let buf: SharedBuf = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&buf);
    let task = tokio::spawn(async move {
        let Some(mut reader) = reader else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut guard) = shared.lock() {
                        guard.extend_from_slice(&chunk[..n]);
                    }
                },
            }
        }
    });
    (task, buf)
}

fn take_buf(buf: &SharedBuf) -> String {
    let guard = buf.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&guard).into_owned()
}
