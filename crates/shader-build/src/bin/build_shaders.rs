//! Shader build tool
//!
//! Compiles every shader below an input directory into SPIR-V, mirroring the
//! directory layout under the output directory.
//!
//! # Usage
//! ```bash
//! build_shaders shaders build/shaders /usr/bin/glslc true
//! build_shaders --config shaders.yaml --report report.json
//! ```
//!
//! Exits with 0 when every shader compiled, 1 when any shader failed and 2 when
//! the build could not start at all.

use clap::Parser;
use std::{path::PathBuf, process};
use vkengine_shader_build::{BuildConfig, ConfigOverrides, ShaderPipeline, command_line, parse_debug_switch};

/// Command-line arguments for the shader build
#[derive(Parser)]
#[command(version, about = "Compiles a tree of GLSL shaders to SPIR-V")]
struct Args {
    /// Directory containing shader sources
    input_root: Option<PathBuf>,

    /// Directory receiving compiled modules (created if absent)
    output_root: Option<PathBuf>,

    /// Shader compiler executable, e.g. glslc
    compiler_path: Option<PathBuf>,

    /// Emit debug info instead of optimizing (true/false, on/off, debug/release)
    #[arg(value_parser = parse_debug_switch)]
    debug: Option<bool>,

    /// Compiler flag used when debug info is off
    #[arg(long, allow_hyphen_values = true)]
    optimization_flag: Option<String>,

    /// Per-file compiler timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// YAML build configuration; positional arguments override its values
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write a JSON report of every job to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the compiler command lines without running them
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
            compiler_path: self.compiler_path.clone(),
            debug: self.debug,
            optimization_flag: self.optimization_flag.clone(),
            timeout_secs: self.timeout,
        }
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install logger: {e}");
    }

    let base = match &args.config {
        Some(path) => match BuildConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
        },
        None => None,
    };
    let config = match args.overrides().apply(base) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: build_shaders <input-root> <output-root> <compiler-path> <debug-flag>");
            process::exit(2);
        }
    };

    let pipeline = ShaderPipeline::new(config);

    if args.dry_run {
        match pipeline.plan() {
            Ok(jobs) => {
                for job in &jobs {
                    let line: Vec<_> = command_line(&pipeline.config().compiler_path, job)
                        .iter()
                        .map(|arg| arg.to_string_lossy().into_owned())
                        .collect();
                    println!("{}", line.join(" "));
                }
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
        }
        return;
    }

    let report = match pipeline.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    for result in &report.results {
        if result.is_success() {
            println!("✓ {}", result.job.input.display());
        } else {
            eprintln!("✗ {}: {}", result.job.input.display(), result.outcome);
        }
    }
    println!(
        "{} compiled, {} failed, {} skipped",
        report.succeeded(),
        report.results.len() - report.succeeded(),
        report.skipped
    );

    if let Some(path) = &args.report {
        if let Err(e) = report.write_json(path) {
            eprintln!("Error writing report '{}': {e}", path.display());
            process::exit(2);
        }
        println!("Report written to '{}'", path.display());
    }

    if !report.is_success() {
        process::exit(1);
    }
}
