//! Crash-loop testing for vkengine samples
//!
//! This crate repeatedly launches a built sample with a bounded run time and
//! watches each attempt for a crash or a validation-layer error. Samples are
//! expected to run until killed, so an attempt that hits its timeout counts as
//! a clean run and the loop starts the next one.

mod error;
mod signature;
mod supervisor;

pub use error::SoakError;
pub use signature::{DEFAULT_SIGNATURE, SignatureMatch, SignatureSet};
pub use supervisor::{AttemptOutcome, SoakConfig, SoakReport, StopReason, Supervisor, classify_attempt};
