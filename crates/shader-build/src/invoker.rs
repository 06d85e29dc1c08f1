//! External compiler invocation
//!
//! Every accepted shader becomes a [`CompileJob`], which the
//! [`CompilerInvoker`] turns into `<compiler> -c <flag> <input> -o <output>`.
//! The invoker never fails: a compiler that exits nonzero, hangs, or cannot be
//! launched at all is recorded in the job's [`CompileResult`].

use crate::ShaderStage;
use serde::Serialize;
use std::{
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};
use vkengine_process::ProcessRunner;

/// Flag passed to the compiler when debug info is off
pub const DEFAULT_OPTIMIZATION_FLAG: &str = "-Os";

/// Flag passed to the compiler when debug info is on
pub const DEBUG_FLAG: &str = "-g";

/// Debug info or optimization, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Emit debug info (`-g`)
    Debug,
    /// Optimize with the given flag (e.g. `-Os`)
    Optimized(String),
}

impl CompileMode {
    pub fn new(debug: bool, optimization_flag: &str) -> Self {
        if debug { Self::Debug } else { Self::Optimized(optimization_flag.to_string()) }
    }

    /// The single compiler flag this mode contributes
    pub fn flag(&self) -> &str {
        match self {
            Self::Debug => DEBUG_FLAG,
            Self::Optimized(flag) => flag,
        }
    }
}

impl Default for CompileMode {
    fn default() -> Self {
        Self::Optimized(DEFAULT_OPTIMIZATION_FLAG.to_string())
    }
}

/// One shader to compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stage: ShaderStage,
    pub mode: CompileMode,
}

impl CompileJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, stage: ShaderStage, mode: CompileMode) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            stage,
            mode,
        }
    }

    /// Compiler arguments, without the compiler itself
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            "-c".into(),
            self.mode.flag().into(),
            self.input.clone().into_os_string(),
            "-o".into(),
            self.output.clone().into_os_string(),
        ]
    }
}

/// What happened to a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileOutcome {
    /// The compiler exited with status 0
    Succeeded,
    /// The compiler ran and reported failure (`None` if killed by a signal)
    #[serde(rename = "compile_failure")]
    Failed { code: Option<i32> },
    /// The compiler was still running when the timeout elapsed
    TimedOut { after: Duration },
    /// The compiler could not be started
    LaunchError { message: String },
    /// The job's output directory could not be created, so nothing ran
    #[serde(rename = "directory_create_error")]
    DirectoryError { message: String },
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Short machine-friendly name of the outcome
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "compile_failure",
            Self::TimedOut { .. } => "timed_out",
            Self::LaunchError { .. } => "launch_error",
            Self::DirectoryError { .. } => "directory_create_error",
        }
    }
}

impl fmt::Display for CompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "compiled"),
            Self::Failed { code: Some(code) } => write!(f, "compiler exited with status {code}"),
            Self::Failed { code: None } => write!(f, "compiler was terminated by a signal"),
            Self::TimedOut { after } => write!(f, "compiler timed out after {after:.2?}"),
            Self::LaunchError { message } => write!(f, "failed to launch compiler: {message}"),
            Self::DirectoryError { message } => write!(f, "{message}"),
        }
    }
}

/// A job together with what happened to it
#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub job: CompileJob,
    pub outcome: CompileOutcome,
    /// Compiler stdout and stderr, when it printed anything
    pub diagnostics: Option<String>,
    pub duration: Duration,
}

impl CompileResult {
    /// Result for a job that never reached the compiler
    pub fn not_run(job: CompileJob, outcome: CompileOutcome) -> Self {
        Self {
            job,
            outcome,
            diagnostics: None,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Runs the external shader compiler, one job at a time
#[derive(Debug)]
pub struct CompilerInvoker {
    compiler: PathBuf,
    timeout: Option<Duration>,
    runner: ProcessRunner,
}

impl CompilerInvoker {
    /// Creates an invoker for `compiler`
    ///
    /// `timeout` bounds each compiler run; `None` waits indefinitely.
    pub fn new(compiler: impl Into<PathBuf>, timeout: Option<Duration>) -> io::Result<Self> {
        Ok(Self {
            compiler: compiler.into(),
            timeout,
            runner: ProcessRunner::new()?,
        })
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    /// Full command line for `job`, compiler first
    pub fn command_line(&self, job: &CompileJob) -> Vec<OsString> {
        command_line(&self.compiler, job)
    }

    /// Runs the compiler for `job` and records the outcome
    pub fn invoke(&self, job: CompileJob) -> CompileResult {
        let mut command = Command::new(&self.compiler);
        command.args(job.arguments());

        match self.runner.run(command, self.timeout) {
            Ok(output) => {
                let outcome = match output.status {
                    None => CompileOutcome::TimedOut { after: output.elapsed },
                    Some(status) if status.success() => CompileOutcome::Succeeded,
                    Some(status) => CompileOutcome::Failed { code: status.code() },
                };
                let diagnostics = [output.stdout.trim(), output.stderr.trim()]
                    .into_iter()
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");

                CompileResult {
                    job,
                    outcome,
                    diagnostics: (!diagnostics.is_empty()).then_some(diagnostics),
                    duration: output.elapsed,
                }
            }
            Err(e) => CompileResult::not_run(
                job,
                CompileOutcome::LaunchError {
                    message: format!("{}: {e}", self.compiler.display()),
                },
            ),
        }
    }
}

/// Full command line for `job` when compiled with `compiler`
pub fn command_line(compiler: &Path, job: &CompileJob) -> Vec<OsString> {
    let mut line = vec![compiler.as_os_str().to_os_string()];
    line.extend(job.arguments());
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(mode: CompileMode) -> CompileJob {
        CompileJob::new("shaders/a.vert", "out/a_vertex.spv", ShaderStage::Vertex, mode)
    }

    #[test]
    fn test_command_line_layout() {
        let line = command_line(Path::new("glslc"), &job(CompileMode::Debug));
        let expected: Vec<OsString> = ["glslc", "-c", "-g", "shaders/a.vert", "-o", "out/a_vertex.spv"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(line, expected);
    }

    #[test]
    fn test_mode_selects_exactly_one_flag() {
        let debug = job(CompileMode::new(true, "-Os")).arguments();
        assert!(debug.contains(&OsString::from("-g")));
        assert!(!debug.contains(&OsString::from("-Os")));

        let release = job(CompileMode::new(false, "-Os")).arguments();
        assert!(release.contains(&OsString::from("-Os")));
        assert!(!release.contains(&OsString::from("-g")));

        let custom = job(CompileMode::new(false, "-O")).arguments();
        assert_eq!(custom[1], OsString::from("-O"));
    }

    #[test]
    fn test_missing_compiler_is_launch_error() {
        let invoker = CompilerInvoker::new("/nonexistent/glslc", None).unwrap();
        let result = invoker.invoke(job(CompileMode::Debug));
        assert!(matches!(result.outcome, CompileOutcome::LaunchError { .. }));
        assert_eq!(result.outcome.kind(), "launch_error");
        assert!(!result.is_success());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CompileOutcome::Failed { code: Some(2) }.to_string(), "compiler exited with status 2");
        assert_eq!(CompileOutcome::Succeeded.to_string(), "compiled");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::{fs, os::unix::fs::PermissionsExt};

        fn compiler_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-glslc");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_success_writes_output() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler_script(dir.path(), r#"cp "$3" "$5""#);
            let input = dir.path().join("a.vert");
            let output = dir.path().join("a_vertex.spv");
            fs::write(&input, "void main() {}").unwrap();

            let invoker = CompilerInvoker::new(&compiler, None).unwrap();
            let result = invoker.invoke(CompileJob::new(&input, &output, ShaderStage::Vertex, CompileMode::Debug));
            assert_eq!(result.outcome, CompileOutcome::Succeeded);
            assert!(result.diagnostics.is_none());
            assert!(output.is_file());
        }

        #[test]
        fn test_nonzero_exit_is_recorded_with_diagnostics() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler_script(dir.path(), r#"echo "$3:1: error: syntax" >&2; exit 2"#);

            let invoker = CompilerInvoker::new(&compiler, None).unwrap();
            let result = invoker.invoke(job(CompileMode::Debug));
            assert_eq!(result.outcome, CompileOutcome::Failed { code: Some(2) });
            assert_eq!(result.diagnostics.as_deref(), Some("shaders/a.vert:1: error: syntax"));
        }

        #[test]
        fn test_hung_compiler_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler_script(dir.path(), "exec sleep 10");

            let invoker = CompilerInvoker::new(&compiler, Some(Duration::from_millis(200))).unwrap();
            let result = invoker.invoke(job(CompileMode::Debug));
            assert!(matches!(result.outcome, CompileOutcome::TimedOut { .. }));
        }

        #[test]
        fn test_arguments_reach_the_compiler() {
            let dir = tempfile::tempdir().unwrap();
            let compiler = compiler_script(dir.path(), r#"printf '%s\n' "$*""#);

            let invoker = CompilerInvoker::new(&compiler, None).unwrap();
            let result = invoker.invoke(job(CompileMode::default()));
            assert_eq!(result.diagnostics.as_deref(), Some("-c -Os shaders/a.vert -o out/a_vertex.spv"));
        }
    }
}
