//! vkengine shader build utilities
//!
//! This crate compiles a directory tree of GLSL shader sources into SPIR-V
//! modules with an external compiler such as `glslc`. The output tree mirrors
//! the input tree, and every compiled module is named after its source plus a
//! stage suffix, e.g. `post/blur.frag` becomes `post/blur_fragment.spv`.
//!
//! The build runs one file at a time and never stops early: each shader gets a
//! [`CompileResult`] and the caller decides what to do with the failures.

mod config;
mod error;
mod invoker;
mod mirror;
mod pipeline;
mod sources;
mod stage;

pub use config::{BuildConfig, ConfigOverrides, parse_debug_switch};
pub use error::BuildError;
pub use invoker::{CompileJob, CompileMode, CompileOutcome, CompileResult, CompilerInvoker, DEBUG_FLAG, DEFAULT_OPTIMIZATION_FLAG, command_line};
pub use mirror::{OutputMirror, SPIRV_EXTENSION};
pub use pipeline::{BuildReport, ShaderPipeline};
pub use sources::{SourceFile, Sources, enumerate_sources};
pub use stage::{Classification, ShaderStage, classify};
