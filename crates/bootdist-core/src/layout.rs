//! On-disk layout of a distribution.
//!
//! ```text
//! <dist_root>/
//!   <name>-<version>.<platform>/     version directory (freezer output)
//!     python311.zip                  full archive
//!     bootdist-files/
//!       bootstrap-manifest.txt
//!       runtime-identity.txt
//!       complete
//!   bootstrap/                       bootstrap directory
//!     python311.zip                  bootstrap archive
//! ```

use bootdist_schema::Platform;
use std::path::{Path, PathBuf};

use crate::error::{PackagingError, Result};
use crate::io::copy::copy_path;
use crate::manifest::BootstrapManifest;

/// Bootstrap directory name under the dist root.
pub const BOOTSTRAP_DIR: &str = "bootstrap";

/// Metadata directory inside each version directory.
pub const META_DIR: &str = "bootdist-files";

pub const MANIFEST_FILE: &str = "bootstrap-manifest.txt";

pub const RUNTIME_IDENTITY_FILE: &str = "runtime-identity.txt";

/// Written last; its presence means every packaging step succeeded.
pub const COMPLETE_MARKER: &str = "complete";

/// Version directory name: `example-1.0.linux-x86_64`.
pub fn version_dir_name(name: &str, version: &str, platform: &Platform) -> String {
    format!("{name}-{version}.{}", platform.tag())
}

/// Resolved paths for one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistLayout {
    root: PathBuf,
    version_dir: PathBuf,
    bootstrap_dir: PathBuf,
}

impl DistLayout {
    /// Lay out a run under `root`.
    ///
    /// A relative root is anchored to the current directory here, so manifest
    /// entries and collaborator working directories never depend on it later.
    pub fn new(root: impl Into<PathBuf>, name: &str, version: &str, platform: &Platform) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            version_dir: root.join(version_dir_name(name, version, platform)),
            bootstrap_dir: root.join(BOOTSTRAP_DIR),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version directory: `<root>/<name>-<version>.<platform>`
    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    /// Bootstrap directory: `<root>/bootstrap`
    pub fn bootstrap_dir(&self) -> &Path {
        &self.bootstrap_dir
    }

    /// Metadata directory: `<version_dir>/bootdist-files`
    pub fn meta_dir(&self) -> PathBuf {
        self.version_dir.join(META_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.meta_dir().join(MANIFEST_FILE)
    }

    pub fn runtime_identity_path(&self) -> PathBuf {
        self.meta_dir().join(RUNTIME_IDENTITY_FILE)
    }

    pub fn complete_marker_path(&self) -> PathBuf {
        self.meta_dir().join(COMPLETE_MARKER)
    }

    /// Path of `name` inside the version directory.
    pub fn frozen_path(&self, name: &str) -> PathBuf {
        self.version_dir.join(name)
    }

    /// Path of `name` inside the bootstrap directory.
    pub fn bootstrap_path(&self, name: &str) -> PathBuf {
        self.bootstrap_dir.join(name)
    }

    /// Start from empty version and bootstrap directories.
    ///
    /// Anything left by an earlier run is removed, so a failed run can simply
    /// be invoked again.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be removed or created.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.version_dir, &self.bootstrap_dir] {
            if dir.exists() {
                tracing::debug!(dir = %dir.display(), "clearing previous output");
                std::fs::remove_dir_all(dir).map_err(PackagingError::io_at(dir))?;
            }
            std::fs::create_dir_all(dir).map_err(PackagingError::io_at(dir))?;
        }
        Ok(())
    }

    /// Copy `name` from the version directory into the bootstrap directory and
    /// register it in `manifest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy or the registration fails.
    pub fn copy_to_bootstrap_env(
        &self,
        name: &str,
        manifest: &mut BootstrapManifest,
    ) -> Result<PathBuf> {
        let src = self.frozen_path(name);
        let dst = self.bootstrap_path(name);
        copy_path(&src, &dst)?;
        manifest.register(&dst)?;
        Ok(dst)
    }

    /// Record the runtime identity of this version directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_runtime_identity(&self, identity: &str) -> Result<()> {
        write_meta(&self.runtime_identity_path(), identity)
    }

    /// Mark the version directory as complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn mark_complete(&self) -> Result<()> {
        write_meta(&self.complete_marker_path(), "")
    }

    pub fn is_complete(&self) -> bool {
        self.complete_marker_path().is_file()
    }
}

fn write_meta(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PackagingError::io_at(parent))?;
    }
    std::fs::write(path, contents).map_err(PackagingError::io_at(path))
}

/// Read the runtime identity recorded in `version_dir`, if any.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_runtime_identity(version_dir: &Path) -> Result<Option<String>> {
    let path = version_dir.join(META_DIR).join(RUNTIME_IDENTITY_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PackagingError::IoAt { path, source: e }),
    }
}
