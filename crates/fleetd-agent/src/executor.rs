//! Subprocess execution with log-file capture.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Spawns task commands with stdin suppressed and stdout/stderr redirected
/// to freshly truncated log files.
pub struct TaskExecutor;

impl TaskExecutor {
    /// Spawn `command` with `args`. The log files are created (truncating
    /// any previous run's output) and handed to the child; the parent's
    /// copies are dropped at spawn, so no descriptor outlives the cycle.
    pub fn spawn(
        command: &str,
        args: &[String],
        stdout_path: &Path,
        stderr_path: &Path,
    ) -> std::io::Result<RunningTask> {
        let stdout = std::fs::File::create(stdout_path)?;
        let stderr = std::fs::File::create(stderr_path)?;

        info!(command = %command, args = ?args, "spawning task process");
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()?;

        Ok(RunningTask { child })
    }
}

/// Handle to a spawned task process.
pub struct RunningTask {
    child: Child,
}

impl RunningTask {
    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcibly terminate the process. Safe to call after it has already
    /// exited; the caller must still `wait()` to reap it.
    pub fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            debug!(error = %err, "kill on exited process ignored");
        }
    }
}
