//! Bootstrap manifest.
//!
//! The manifest lists every file placed in the bootstrap directory, relative
//! to that directory, so the update manager knows what must never be touched.
//! It is append-only and deliberately not deduplicated: each registration is
//! one line, and callers register once per file they actually wrote.

use std::path::{Component, Path, PathBuf};

use crate::error::{PackagingError, Result};

/// Append-only list of bootstrap-relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapManifest {
    root: PathBuf,
    entries: Vec<PathBuf>,
}

impl BootstrapManifest {
    /// Start an empty manifest for the bootstrap directory at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append `path`. Paths under the bootstrap directory, absolute or not,
    /// are stored relative to it; other relative paths are taken as already
    /// bootstrap-relative.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Configuration`] for an absolute path outside
    /// the bootstrap directory or one that climbs out with `..`.
    pub fn register(&mut self, path: &Path) -> Result<()> {
        let relative = if let Ok(inner) = path.strip_prefix(&self.root) {
            inner
        } else if path.is_absolute() {
            return Err(PackagingError::configuration(format!(
                "{} is outside the bootstrap directory {}",
                path.display(),
                self.root.display()
            )));
        } else {
            path
        };
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PackagingError::configuration(format!(
                "invalid bootstrap manifest entry: {}",
                path.display()
            )));
        }
        tracing::debug!(entry = %relative.display(), "registered bootstrap file");
        self.entries.push(relative.to_path_buf());
        Ok(())
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-separated text form, `/` separated on every platform.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let parts: Vec<_> = entry
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            out.push_str(&parts.join("/"));
            out.push('\n');
        }
        out
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PackagingError::io_at(parent))?;
        }
        std::fs::write(path, self.render()).map_err(PackagingError::io_at(path))
    }

    /// Read a manifest written by [`BootstrapManifest::write_to`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(root: impl Into<PathBuf>, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(PackagingError::io_at(path))?;
        Ok(Self {
            root: root.into(),
            entries: text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(PathBuf::from)
                .collect(),
        })
    }
}
