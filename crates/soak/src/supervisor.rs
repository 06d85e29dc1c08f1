//! Crash-loop supervisor
//!
//! Launches the executable under test over and over, each time with a bounded
//! run time, until an attempt crashes or prints a signature.

use crate::{SignatureSet, SoakError, signature::DEFAULT_SIGNATURE};
use std::{
    ffi::OsString,
    fmt, io,
    path::PathBuf,
    process::Command,
    time::Duration,
};
use vkengine_process::{ProcessOutput, ProcessRunner};

/// Default run time of one attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// What to run and when to stop
#[derive(Debug, Clone)]
pub struct SoakConfig {
    pub executable: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory for every attempt (inherited when `None`)
    pub working_dir: Option<PathBuf>,
    pub attempt_timeout: Duration,
    /// Stop after this many clean attempts (run forever when `None`)
    pub max_iterations: Option<u64>,
    /// Regular expressions searched for in stderr and stdout
    pub signatures: Vec<String>,
}

impl SoakConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_iterations: None,
            signatures: vec![DEFAULT_SIGNATURE.to_string()],
        }
    }
}

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The program exited with status 0 on its own
    Completed { code: i32 },
    /// The program was still running at the timeout and was killed
    TimedOut,
    /// The program exited nonzero (`None` if killed by a signal)
    Crashed { code: Option<i32> },
    /// A signature was found in the program's output
    SignatureDetected { pattern: String, line: String },
}

impl AttemptOutcome {
    /// Returns true if this attempt ends the soak run
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Crashed { .. } | Self::SignatureDetected { .. })
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { code } => write!(f, "exited with status {code}"),
            Self::TimedOut => write!(f, "still running at timeout"),
            Self::Crashed { code: Some(code) } => write!(f, "crashed with status {code}"),
            Self::Crashed { code: None } => write!(f, "terminated by a signal"),
            Self::SignatureDetected { pattern, line } => write!(f, "matched '{pattern}': {line}"),
        }
    }
}

/// Why a soak run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// An attempt crashed or matched a signature
    Failure(AttemptOutcome),
    /// The configured number of attempts ran cleanly
    IterationLimit,
}

/// Summary of a soak run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoakReport {
    /// Number of attempts made, including the failing one
    pub iterations: u64,
    pub stop: StopReason,
}

impl SoakReport {
    /// Returns true if the run found a crash or a signature
    pub fn found_failure(&self) -> bool {
        matches!(self.stop, StopReason::Failure(_))
    }
}

/// Classifies one finished attempt
///
/// A signature wins over the exit status, since it says more about what went
/// wrong. Signatures are searched in stderr first, then stdout.
pub fn classify_attempt(output: &ProcessOutput, signatures: &SignatureSet) -> AttemptOutcome {
    if let Some(found) = signatures.find(&output.stderr).or_else(|| signatures.find(&output.stdout)) {
        return AttemptOutcome::SignatureDetected {
            pattern: found.pattern,
            line: found.line,
        };
    }

    match output.status {
        None => AttemptOutcome::TimedOut,
        Some(status) if status.success() => AttemptOutcome::Completed { code: 0 },
        Some(status) => AttemptOutcome::Crashed { code: status.code() },
    }
}

/// Runs attempts until something goes wrong
#[derive(Debug)]
pub struct Supervisor {
    config: SoakConfig,
    signatures: SignatureSet,
    runner: ProcessRunner,
}

impl Supervisor {
    /// Creates a supervisor, compiling the configured signatures
    pub fn new(config: SoakConfig) -> Result<Self, SoakError> {
        let signatures = SignatureSet::new(&config.signatures)?;
        if signatures.is_empty() {
            tracing::warn!("no signatures configured, only crashes will stop the run");
        }
        Ok(Self {
            config,
            signatures,
            runner: ProcessRunner::new()?,
        })
    }

    /// Runs the executable once and classifies the result
    pub fn attempt(&self) -> Result<AttemptOutcome, SoakError> {
        let mut command = Command::new(&self.config.executable);
        command.args(&self.config.args);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let output = self
            .runner
            .run(command, Some(self.config.attempt_timeout))
            .map_err(|source| self.launch_error(source))?;
        Ok(classify_attempt(&output, &self.signatures))
    }

    /// Loops attempts until a failure or the iteration limit
    pub fn run(&self) -> Result<SoakReport, SoakError> {
        self.run_with(|_, _| {})
    }

    /// Like [`Supervisor::run`], calling `on_attempt` with the 0-based
    /// iteration number and outcome after every attempt
    pub fn run_with(&self, mut on_attempt: impl FnMut(u64, &AttemptOutcome)) -> Result<SoakReport, SoakError> {
        let mut iteration = 0;
        loop {
            if self.config.max_iterations.is_some_and(|limit| iteration >= limit) {
                tracing::info!(iterations = iteration, "iteration limit reached without a crash");
                return Ok(SoakReport {
                    iterations: iteration,
                    stop: StopReason::IterationLimit,
                });
            }

            let outcome = self.attempt()?;
            tracing::debug!(iteration, "{outcome}");
            on_attempt(iteration, &outcome);
            iteration += 1;

            if outcome.is_failure() {
                tracing::warn!(iterations = iteration, "{outcome}");
                return Ok(SoakReport {
                    iterations: iteration,
                    stop: StopReason::Failure(outcome),
                });
            }
        }
    }

    fn launch_error(&self, source: io::Error) -> SoakError {
        SoakError::Launch {
            executable: self.config.executable.clone(),
            source,
        }
    }
}
