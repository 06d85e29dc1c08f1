//! Shader stage classification
//!
//! Maps a source file extension to the pipeline stage it targets. The table is
//! fixed and matched case-sensitively, so `shader.VERT` is not a vertex shader.

use serde::Serialize;
use std::{fmt, path::Path};

/// Pipeline stage a shader source targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
}

impl ShaderStage {
    /// Looks up the stage for a source extension (without the leading dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "frag" => Some(Self::Fragment),
            "vert" => Some(Self::Vertex),
            "comp" => Some(Self::Compute),
            "tese" => Some(Self::TessellationEvaluation),
            "tesc" => Some(Self::TessellationControl),
            "geom" => Some(Self::Geometry),
            _ => None,
        }
    }

    /// Source file extension for this stage
    pub fn extension(self) -> &'static str {
        match self {
            Self::Fragment => "frag",
            Self::Vertex => "vert",
            Self::Compute => "comp",
            Self::TessellationEvaluation => "tese",
            Self::TessellationControl => "tesc",
            Self::Geometry => "geom",
        }
    }

    /// Suffix appended to the file stem of the compiled module
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Fragment => "_fragment",
            Self::Vertex => "_vertex",
            Self::Compute => "_compute",
            Self::TessellationEvaluation => "_evaluation",
            Self::TessellationControl => "_control",
            Self::Geometry => "_geometry",
        }
    }

    /// Human-readable stage name
    pub fn name(self) -> &'static str {
        match self {
            Self::Fragment => "fragment",
            Self::Vertex => "vertex",
            Self::Compute => "compute",
            Self::TessellationEvaluation => "tessellation-evaluation",
            Self::TessellationControl => "tessellation-control",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The file is a shader for `stage` and compiles to `<stem><suffix>.spv`
    Recognized { stage: ShaderStage, suffix: &'static str },
    /// The file is not a shader source and is left alone
    Skipped,
}

/// Classifies a path by its final extension
pub fn classify(path: &Path) -> Classification {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(ShaderStage::from_extension)
        .map_or(Classification::Skipped, |stage| Classification::Recognized { stage, suffix: stage.suffix() })
}
