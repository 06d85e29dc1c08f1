//! Source enumeration
//!
//! Walks the input root and yields every regular file below it together with
//! its path relative to the root. Symlinked directories are never descended
//! into, so a link cycle cannot make the walk loop forever. Entries are sorted
//! by file name within each directory to keep builds reproducible.

use crate::BuildError;
use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// A file found below the input root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    relative_path: PathBuf,
}

impl SourceFile {
    /// Creates a source file from a path below `root`
    ///
    /// Returns `None` when `path` does not live under `root`.
    pub fn new(root: &Path, path: PathBuf) -> Option<Self> {
        let relative_path = path.strip_prefix(root).ok()?.to_path_buf();
        if relative_path.as_os_str().is_empty() {
            return None;
        }
        Some(Self { path, relative_path })
    }

    /// Full path of the file, as found during the walk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the input root
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Directory part of the relative path (empty for files directly in the root)
    pub fn relative_dir(&self) -> &Path {
        self.relative_path.parent().unwrap_or(Path::new(""))
    }

    /// Final extension without the dot, exactly as written
    pub fn extension(&self) -> Option<&str> {
        self.relative_path.extension().and_then(OsStr::to_str)
    }

    /// File name without its final extension
    pub fn stem(&self) -> &OsStr {
        self.relative_path.file_stem().unwrap_or_default()
    }
}

/// Lazy iterator over the files below an input root
pub struct Sources {
    root: PathBuf,
    walker: walkdir::IntoIter,
    skipped_dirs: Vec<PathBuf>,
}

impl Sources {
    /// Leaves out the directory at `relative` (relative to the root) and everything below it
    pub fn skip_dir(mut self, relative: impl Into<PathBuf>) -> Self {
        self.skipped_dirs.push(relative.into());
        self
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .path()
                .strip_prefix(&self.root)
                .is_ok_and(|relative| self.skipped_dirs.iter().any(|dir| dir == relative))
    }
}

impl Iterator for Sources {
    type Item = SourceFile;

    fn next(&mut self) -> Option<SourceFile> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    tracing::warn!(%path, "skipping unreadable entry: {e}");
                    continue;
                }
            };

            if self.is_skipped_dir(&entry) {
                tracing::debug!(path = %entry.path().display(), "not descending into skipped directory");
                self.walker.skip_current_dir();
                continue;
            }

            if !is_regular_file(&entry) {
                continue;
            }

            if let Some(source) = SourceFile::new(&self.root, entry.into_path()) {
                return Some(source);
            }
        }
    }
}

/// Starts enumerating every regular file below `root`
///
/// # Errors
/// * [`BuildError::PathNotFound`] if `root` does not exist
/// * [`BuildError::NotADirectory`] if `root` is not a directory
pub fn enumerate_sources(root: &Path) -> Result<Sources, BuildError> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(BuildError::PathNotFound(root.to_path_buf())),
        Err(e) => return Err(BuildError::Io(e)),
    };
    if !metadata.is_dir() {
        return Err(BuildError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter();
    Ok(Sources {
        root: root.to_path_buf(),
        walker,
        skipped_dirs: Vec::new(),
    })
}

// Symlinks to regular files are kept; symlinks to directories are not followed.
fn is_regular_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && fs::metadata(entry.path()).is_ok_and(|metadata| metadata.is_file())
}
