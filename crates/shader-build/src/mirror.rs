//! Output path mirroring
//!
//! Compiled modules land under the output root at the same relative directory
//! their source had under the input root. Directories are created lazily, the
//! first time a job needs them, and remembered for the rest of the run.

use crate::{BuildError, SourceFile};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// File extension of compiled shader modules
pub const SPIRV_EXTENSION: &str = "spv";

/// Maps source files onto the output tree
#[derive(Debug)]
pub struct OutputMirror {
    root: PathBuf,
    ensured: HashSet<PathBuf>,
}

impl OutputMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ensured: HashSet::new(),
        }
    }

    /// Directory under the output root that mirrors the source's directory
    pub fn output_dir(&self, source: &SourceFile) -> PathBuf {
        let relative_dir = source.relative_dir();
        if relative_dir.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative_dir)
        }
    }

    /// Computes `root/relative_dir/<stem><suffix>.spv` without touching the filesystem
    pub fn output_path(&self, source: &SourceFile, suffix: &str) -> PathBuf {
        let mut file_name = source.stem().to_os_string();
        file_name.push(suffix);
        file_name.push(".");
        file_name.push(SPIRV_EXTENSION);
        self.output_dir(source).join(file_name)
    }

    /// Makes sure `dir` exists, creating missing parents
    ///
    /// Each distinct directory is created at most once per mirror. Calling this
    /// again for a directory that already exists is not an error.
    ///
    /// # Returns
    /// `true` if the directory was created (or first confirmed) by this call
    pub fn ensure_dir(&mut self, dir: &Path) -> Result<bool, BuildError> {
        if self.ensured.contains(dir) {
            return Ok(false);
        }

        fs::create_dir_all(dir).map_err(|source| BuildError::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), "output directory ready");
        self.ensured.insert(dir.to_path_buf());
        Ok(true)
    }

    fn ensure_parent(&mut self, output: &Path) -> Result<(), BuildError> {
        let dir = output.parent().unwrap_or(&self.root).to_path_buf();
        self.ensure_dir(&dir).map(|_| ())
    }

    /// Computes the output path for `source` and creates its directory
    pub fn prepare(&mut self, source: &SourceFile, suffix: &str) -> Result<PathBuf, BuildError> {
        let output = self.output_path(source, suffix);
        self.ensure_parent(&output)?;
        Ok(output)
    }

    /// Directories this mirror has ensured so far
    pub fn ensured_dirs(&self) -> impl Iterator<Item = &Path> {
        self.ensured.iter().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(relative: &str) -> SourceFile {
        let root = Path::new("shaders");
        SourceFile::new(root, root.join(relative)).unwrap()
    }

    #[test]
    fn test_output_path_mirrors_relative_directory() {
        let mirror = OutputMirror::new("out");
        assert_eq!(mirror.output_path(&source("a.vert"), "_vertex"), Path::new("out").join("a_vertex.spv"));
        assert_eq!(
            mirror.output_path(&source("sub/c.geom"), "_geometry"),
            Path::new("out").join("sub").join("c_geometry.spv")
        );
        assert_eq!(
            mirror.output_path(&source("post/blur.horizontal.frag"), "_fragment"),
            Path::new("out").join("post").join("blur.horizontal_fragment.spv")
        );
    }

    #[test]
    fn test_output_path_is_pure() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = OutputMirror::new(dir.path().join("out"));
        mirror.output_path(&source("deep/nested/x.comp"), "_compute");
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_prepare_creates_directories_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = OutputMirror::new(dir.path().join("out"));

        let first = mirror.prepare(&source("sub/c.geom"), "_geometry").unwrap();
        let second = mirror.prepare(&source("sub/d.frag"), "_fragment").unwrap();
        assert_eq!(first, dir.path().join("out/sub/c_geometry.spv"));
        assert_eq!(second, dir.path().join("out/sub/d_fragment.spv"));
        assert!(dir.path().join("out/sub").is_dir());
        assert_eq!(mirror.ensured_dirs().count(), 1);

        let sub = dir.path().join("out/sub");
        assert!(!mirror.ensure_dir(&sub).unwrap());

        // A fresh mirror over existing directories must not fail either
        let mut fresh = OutputMirror::new(dir.path().join("out"));
        assert!(fresh.ensure_dir(&sub).unwrap());
        let entries: Vec<_> = fs::read_dir(dir.path().join("out")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_in_the_way_is_directory_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("sub"), "not a directory").unwrap();

        let mut mirror = OutputMirror::new(&out);
        let result = mirror.prepare(&source("sub/c.geom"), "_geometry");
        assert!(matches!(result, Err(BuildError::DirectoryCreate { path, .. }) if path == out.join("sub")));
        assert_eq!(mirror.ensured_dirs().count(), 0);
    }
}
