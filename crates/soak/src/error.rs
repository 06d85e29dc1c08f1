//! Error types for the soak supervisor

use std::{io, path::PathBuf};

/// Errors that stop a soak run before it can report a result
#[derive(Debug, thiserror::Error)]
pub enum SoakError {
    /// A crash signature is not a valid regular expression
    #[error("invalid signature pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// The executable under test could not be started
    #[error("failed to launch '{}': {source}", .executable.display())]
    Launch {
        /// Executable that was requested
        executable: PathBuf,
        /// Underlying spawn error
        source: io::Error,
    },
    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] io::Error),
}
