//! Shader build pipeline
//!
//! Runs the whole build strictly in sequence: enumerate the input tree,
//! classify each file, mirror its output path, then invoke the compiler. Only
//! a bad input root or an output root that cannot be created abort the run;
//! every other failure is recorded against its job and the batch continues.
//!
//! An output root nested inside the input root is left out of the walk, so
//! modules from an earlier run are never picked up as inputs.

use crate::{
    BuildConfig, BuildError, Classification, CompileJob, CompileOutcome, CompileResult, CompilerInvoker, OutputMirror, ShaderStage,
    SourceFile, Sources, classify, enumerate_sources,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Results of one pipeline run
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    /// One entry per recognized shader, in enumeration order
    pub results: Vec<CompileResult>,
    /// Number of files that were not shader sources
    pub skipped: usize,
}

impl BuildReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|result| result.is_success()).count()
    }

    /// Every job that did not compile cleanly
    pub fn failures(&self) -> impl Iterator<Item = &CompileResult> {
        self.results.iter().filter(|result| !result.is_success())
    }

    /// Returns true if every recognized shader compiled
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Serializes the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report as JSON to `path`
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), BuildError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// The configured shader build
#[derive(Debug, Clone)]
pub struct ShaderPipeline {
    config: BuildConfig,
}

impl ShaderPipeline {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Lists the jobs a run would execute, without touching the output tree
    pub fn plan(&self) -> Result<Vec<CompileJob>, BuildError> {
        let mirror = OutputMirror::new(&self.config.output_root);
        let jobs = self
            .skip_output_root(enumerate_sources(&self.config.input_root)?)
            .filter_map(|source| match classify(source.relative_path()) {
                Classification::Recognized { stage, suffix } => Some(self.job(&source, mirror.output_path(&source, suffix), stage)),
                Classification::Skipped => None,
            })
            .collect();
        Ok(jobs)
    }

    /// Compiles every shader below the input root
    ///
    /// # Errors
    /// * [`BuildError::PathNotFound`] / [`BuildError::NotADirectory`] for a bad input root
    /// * [`BuildError::OutputRoot`] if the output root cannot be created
    /// * [`BuildError::Io`] if the process runtime cannot be started
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let sources = enumerate_sources(&self.config.input_root)?;

        let output_root = &self.config.output_root;
        fs::create_dir_all(output_root).map_err(|source| BuildError::OutputRoot {
            path: output_root.clone(),
            source,
        })?;
        let sources = self.skip_output_root(sources);

        let invoker = CompilerInvoker::new(&self.config.compiler_path, self.config.timeout())?;
        let mode = self.config.compile_mode();
        let mut mirror = OutputMirror::new(output_root);
        let mut report = BuildReport::default();

        tracing::info!(
            input = %self.config.input_root.display(),
            output = %output_root.display(),
            compiler = %invoker.compiler().display(),
            flag = mode.flag(),
            "building shaders"
        );

        for source in sources {
            let Classification::Recognized { stage, suffix } = classify(source.relative_path()) else {
                tracing::debug!(path = %source.relative_path().display(), "skipping non-shader file");
                report.skipped += 1;
                continue;
            };

            tracing::info!(path = %source.relative_path().display(), %stage, "compiling");
            let result = match mirror.prepare(&source, suffix) {
                Ok(output) => invoker.invoke(self.job(&source, output, stage)),
                Err(e) => CompileResult::not_run(
                    self.job(&source, mirror.output_path(&source, suffix), stage),
                    CompileOutcome::DirectoryError { message: e.to_string() },
                ),
            };
            log_result(&source, &result);
            report.results.push(result);
        }

        let failed = report.results.len() - report.succeeded();
        tracing::debug!(directories = mirror.ensured_dirs().count(), "output directories prepared");
        if failed == 0 {
            tracing::info!(compiled = report.succeeded(), skipped = report.skipped, "shader build finished");
        } else {
            tracing::warn!(compiled = report.succeeded(), failed, skipped = report.skipped, "shader build finished with failures");
            for failure in report.failures() {
                tracing::warn!(path = %failure.job.input.display(), kind = failure.outcome.kind(), "{}", failure.outcome);
            }
        }

        Ok(report)
    }

    fn job(&self, source: &SourceFile, output: PathBuf, stage: ShaderStage) -> CompileJob {
        CompileJob::new(source.path(), output, stage, self.config.compile_mode())
    }

    fn skip_output_root(&self, sources: Sources) -> Sources {
        match nested_dir(&self.config.input_root, &self.config.output_root) {
            Some(relative) => sources.skip_dir(relative),
            None => sources,
        }
    }
}

/// Path of `inner` relative to `outer`, if `inner` is a proper subdirectory
///
/// Compares the paths as written first, then their canonical forms so that
/// `./shaders` and `shaders/out` are still recognized.
fn nested_dir(outer: &Path, inner: &Path) -> Option<PathBuf> {
    let relative = match inner.strip_prefix(outer) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            let outer = outer.canonicalize().ok()?;
            let inner = inner.canonicalize().ok()?;
            inner.strip_prefix(&outer).ok()?.to_path_buf()
        }
    };
    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn log_result(source: &SourceFile, result: &CompileResult) {
    let path = source.relative_path().display();
    match &result.outcome {
        CompileOutcome::Succeeded => {
            tracing::debug!(%path, output = %result.job.output.display(), elapsed = ?result.duration, "compiled");
        }
        outcome => {
            tracing::error!(%path, kind = outcome.kind(), "{outcome}");
            if let Some(diagnostics) = &result.diagnostics {
                tracing::error!(%path, "{diagnostics}");
            }
        }
    }
}
