//! Error types for the shader build pipeline
//!
//! Only setup problems are errors. Anything that goes wrong while compiling a
//! single shader is recorded as a [`crate::CompileOutcome`] so the batch can
//! carry on with the remaining files.

use std::{io, path::PathBuf};

/// Errors that stop the pipeline, or a single job's output directory
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The input root does not exist
    #[error("input root '{}' does not exist", .0.display())]
    PathNotFound(PathBuf),
    /// The input root exists but is not a directory
    #[error("input root '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The output root could not be created
    #[error("failed to create output root '{}': {source}", .path.display())]
    OutputRoot {
        /// Output root that was requested
        path: PathBuf,
        /// Underlying filesystem error
        source: io::Error,
    },
    /// A mirrored output directory could not be created
    #[error("failed to create directory '{}': {source}", .path.display())]
    DirectoryCreate {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying filesystem error
        source: io::Error,
    },
    /// The configuration file could not be read
    #[error("failed to read config '{}': {source}", .path.display())]
    ConfigRead {
        /// Configuration file path
        path: PathBuf,
        /// Underlying filesystem error
        source: io::Error,
    },
    /// The configuration file is not valid YAML for [`crate::BuildConfig`]
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_norway::Error),
    /// A required setting was given neither on the command line nor in the config
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),
    /// The build report could not be serialized
    #[error("failed to serialize build report: {0}")]
    Report(#[from] serde_json::Error),
    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] io::Error),
}
