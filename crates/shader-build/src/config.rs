//! Build configuration
//!
//! A build is fully described by [`BuildConfig`]. It can be written as a YAML
//! file and loaded with [`BuildConfig::from_file`], or assembled from command
//! line values with [`ConfigOverrides`]; command line values always win.
//!
//! ```yaml
//! input_root: shaders
//! output_root: build/shaders
//! compiler_path: /usr/bin/glslc
//! debug: false
//! optimization_flag: -Os
//! timeout_secs: 60
//! ```

use crate::{BuildError, CompileMode, invoker::DEFAULT_OPTIMIZATION_FLAG};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

fn default_optimization_flag() -> String {
    DEFAULT_OPTIMIZATION_FLAG.to_string()
}

/// Everything the shader pipeline needs to run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory tree holding shader sources
    pub input_root: PathBuf,
    /// Directory tree receiving compiled modules (created if absent)
    pub output_root: PathBuf,
    /// Shader compiler executable
    pub compiler_path: PathBuf,
    /// Emit debug info instead of optimizing
    #[serde(default)]
    pub debug: bool,
    /// Flag used when `debug` is off
    #[serde(default = "default_optimization_flag")]
    pub optimization_flag: String,
    /// Per-file compiler timeout in seconds (no limit when absent)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl BuildConfig {
    /// Creates a configuration with the default optimization flag and no timeout
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, compiler_path: impl Into<PathBuf>, debug: bool) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            compiler_path: compiler_path.into(),
            debug,
            optimization_flag: default_optimization_flag(),
            timeout_secs: None,
        }
    }

    /// Parses a configuration from YAML content
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses a configuration from a YAML file
    ///
    /// Relative roots and compiler paths are resolved against the directory
    /// containing the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;

        if let Some(base) = path.parent().filter(|base| !base.as_os_str().is_empty()) {
            config.input_root = base.join(&config.input_root);
            config.output_root = base.join(&config.output_root);
            // Bare program names are looked up on PATH, leave those alone
            if config.compiler_path.components().count() > 1 {
                config.compiler_path = base.join(&config.compiler_path);
            }
        }
        Ok(config)
    }

    /// Compiler mode derived from `debug` and `optimization_flag`
    pub fn compile_mode(&self) -> CompileMode {
        CompileMode::new(self.debug, &self.optimization_flag)
    }

    /// Per-file compiler timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Values given on the command line, applied on top of an optional config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub compiler_path: Option<PathBuf>,
    pub debug: Option<bool>,
    pub optimization_flag: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Merges these values over `base`
    ///
    /// # Errors
    /// [`BuildError::MissingSetting`] if a required value is in neither place.
    pub fn apply(self, base: Option<BuildConfig>) -> Result<BuildConfig, BuildError> {
        let mut config = match base {
            Some(config) => config,
            None => BuildConfig::new(
                self.input_root.clone().ok_or(BuildError::MissingSetting("input_root"))?,
                self.output_root.clone().ok_or(BuildError::MissingSetting("output_root"))?,
                self.compiler_path.clone().ok_or(BuildError::MissingSetting("compiler_path"))?,
                self.debug.ok_or(BuildError::MissingSetting("debug"))?,
            ),
        };

        if let Some(input_root) = self.input_root {
            config.input_root = input_root;
        }
        if let Some(output_root) = self.output_root {
            config.output_root = output_root;
        }
        if let Some(compiler_path) = self.compiler_path {
            config.compiler_path = compiler_path;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(optimization_flag) = self.optimization_flag {
            config.optimization_flag = optimization_flag;
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        Ok(config)
    }
}

/// Parses a boolean-like debug switch
///
/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` and `debug/release`,
/// ignoring case.
pub fn parse_debug_switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "debug" => Ok(true),
        "false" | "0" | "no" | "off" | "release" => Ok(false),
        _ => Err(format!("expected one of true/false, 1/0, yes/no, on/off, debug/release, got '{value}'")),
    }
}
