//! Crash-loop tester
//!
//! Launches a sample executable again and again, killing each run after a
//! timeout, until one crashes or prints a validation-layer error.
//!
//! # Usage
//! ```bash
//! soak --cwd build ./Scene
//! soak --timeout 10 --max-iterations 500 --signature "VK_ERROR_\w+" ./Simple -- --headless
//! ```
//!
//! Exits with 1 when a crash or signature was found, 0 when the iteration limit
//! was reached cleanly and 2 when the executable could not be run.

use clap::Parser;
use std::{path::PathBuf, process, time::Duration};
use vkengine_soak::{AttemptOutcome, DEFAULT_SIGNATURE, SoakConfig, StopReason, Supervisor};

/// Command-line arguments for the crash-loop tester
#[derive(Parser)]
#[command(version, about = "Relaunches an executable until it crashes or reports a validation error")]
struct Args {
    /// Executable to launch
    executable: PathBuf,

    /// Arguments passed to the executable
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Working directory for every launch
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Seconds each launch may run before it is killed
    #[arg(long, short, default_value = "5")]
    timeout: f64,

    /// Stop after this many clean launches
    #[arg(long, short = 'n')]
    max_iterations: Option<u64>,

    /// Regular expression marking a failure in the output (repeatable)
    #[arg(long = "signature", short, default_values_t = [DEFAULT_SIGNATURE.to_string()])]
    signatures: Vec<String>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install logger: {e}");
    }

    let attempt_timeout = match Duration::try_from_secs_f64(args.timeout) {
        Ok(timeout) if !timeout.is_zero() => timeout,
        _ => {
            eprintln!("Error: timeout must be a positive number of seconds, got {}", args.timeout);
            process::exit(2);
        }
    };

    let config = SoakConfig {
        args: args.args.iter().map(Into::into).collect(),
        working_dir: args.cwd,
        attempt_timeout,
        max_iterations: args.max_iterations,
        signatures: args.signatures,
        ..SoakConfig::new(args.executable)
    };

    let supervisor = match Supervisor::new(config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let result = supervisor.run_with(|iteration, outcome| {
        if !outcome.is_failure() {
            println!("Iteration number {iteration}: {outcome}");
        }
    });

    match result {
        Ok(report) => match report.stop {
            StopReason::Failure(outcome) => {
                match &outcome {
                    AttemptOutcome::SignatureDetected { line, .. } => eprintln!("✗ Validation failure after {} iterations: {line}", report.iterations),
                    _ => eprintln!("✗ Application {outcome} after {} iterations", report.iterations),
                }
                process::exit(1);
            }
            StopReason::IterationLimit => {
                println!("✓ No crash in {} iterations", report.iterations);
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}
