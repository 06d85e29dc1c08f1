//! vkengine subprocess execution
//!
//! Blocking subprocess execution with an optional timeout. Both the shader
//! compiler invoker and the soak supervisor run external programs one at a
//! time. [`ProcessRunner`] owns a current-thread tokio runtime and blocks
//! on each child, draining stdout and stderr while it runs so a chatty child
//! cannot stall on a full pipe. A child that outlives its timeout is killed and
//! whatever it printed up to that point is kept.

use std::{
    io,
    process::{Command, ExitStatus, Stdio},
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    task::JoinHandle,
};

/// How long to keep draining pipes after a killed child
///
/// A grandchild that inherited the pipes can keep them open past the kill.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Bytes read from one pipe so far, shared with its drain task
type Captured = Arc<Mutex<Vec<u8>>>;

/// Captured result of one child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status, or `None` if the child was killed for running too long
    pub status: Option<ExitStatus>,
    /// Everything the child wrote to stdout (lossy UTF-8)
    pub stdout: String,
    /// Everything the child wrote to stderr (lossy UTF-8)
    pub stderr: String,
    /// Wall-clock time from spawn to exit or kill
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Returns true if the child was killed after its timeout elapsed
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    /// Returns true if the child exited with status 0
    pub fn success(&self) -> bool {
        self.status.is_some_and(|status| status.success())
    }
}

/// Runs child processes synchronously
#[derive(Debug)]
pub struct ProcessRunner {
    runtime: tokio::runtime::Runtime,
}

impl ProcessRunner {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    /// Runs `command` to completion, or until `timeout` elapses
    ///
    /// stdin is closed and stdout/stderr are captured regardless of how
    /// `command` was configured.
    ///
    /// # Errors
    /// Returns the spawn error if the program could not be started, or any
    /// error raised while waiting on it.
    pub fn run(&self, command: Command, timeout: Option<Duration>) -> io::Result<ProcessOutput> {
        self.runtime.block_on(run_child(command, timeout))
    }
}

async fn run_child(command: Command, timeout: Option<Duration>) -> io::Result<ProcessOutput> {
    let mut command = tokio::process::Command::from(command);
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    let started = Instant::now();
    let mut child = command.spawn()?;
    let stdout = Captured::default();
    let stderr = Captured::default();
    let stdout_task = tokio::spawn(drain(child.stdout.take(), Arc::clone(&stdout)));
    let stderr_task = tokio::spawn(drain(child.stderr.take(), Arc::clone(&stderr)));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill timed out process: {e}");
                }
                None
            }
        },
        None => Some(child.wait().await?),
    };
    let elapsed = started.elapsed();

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout_task, &stdout).await,
        stderr: collect(stderr_task, &stderr).await,
        elapsed,
    })
}

// Appends every chunk as soon as it is read, so the bytes survive an abort.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, captured: Captured) {
    let Some(mut pipe) = pipe else { return };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(read) => captured.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(&chunk[..read]),
        }
    }
}

/// Waits for a drain task to see end-of-file, then returns what it captured
///
/// A pipe still held open by a grandchild is given up on after
/// [`DRAIN_GRACE`]; the bytes read until then are returned.
async fn collect(task: JoinHandle<()>, captured: &Captured) -> String {
    let abort = task.abort_handle();
    if tokio::time::timeout(DRAIN_GRACE, task).await.is_err() {
        tracing::debug!("output pipe still open after the child exited; keeping partial output");
        abort.abort();
    }
    let bytes = captured.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn test_captures_output_and_status() {
        let runner = ProcessRunner::new().unwrap();
        let output = runner.run(shell("echo out; echo err >&2; exit 3"), None).unwrap();
        assert_eq!(output.status.and_then(|s| s.code()), Some(3));
        assert!(!output.success());
        assert!(!output.timed_out());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn test_success_within_timeout() {
        let runner = ProcessRunner::new().unwrap();
        let output = runner.run(shell("true"), Some(Duration::from_secs(10))).unwrap();
        assert!(output.success());
    }

    #[test]
    fn test_timeout_kills_child_and_keeps_partial_output() {
        let runner = ProcessRunner::new().unwrap();
        let output = runner.run(shell("echo started >&2; exec sleep 10"), Some(Duration::from_millis(300))).unwrap();
        assert!(output.timed_out());
        assert!(output.elapsed < Duration::from_secs(5));
        assert_eq!(output.stderr, "started\n");
    }

    #[test]
    fn test_timeout_keeps_output_when_grandchild_holds_pipes() {
        let runner = ProcessRunner::new().unwrap();
        // Without exec, the shell's sleep child keeps both pipes open past the kill
        let output = runner
            .run(shell("echo 'Validation Error: layout' >&2; echo frame 1; sleep 10"), Some(Duration::from_millis(300)))
            .unwrap();
        assert!(output.timed_out());
        assert_eq!(output.stderr, "Validation Error: layout\n");
        assert_eq!(output.stdout, "frame 1\n");
    }

    #[test]
    fn test_exited_child_with_lingering_grandchild() {
        let runner = ProcessRunner::new().unwrap();
        let output = runner.run(shell("echo done; sleep 10 & exit 0"), None).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "done\n");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::new().unwrap();
        let result = runner.run(Command::new("/nonexistent/definitely-not-a-compiler"), None);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_runner_is_reusable() {
        let runner = ProcessRunner::new().unwrap();
        for expected in 0..3 {
            let output = runner.run(shell(&format!("exit {expected}")), None).unwrap();
            assert_eq!(output.status.and_then(|s| s.code()), Some(expected));
        }
    }
}
