//! Errors for a packaging run.
//!
//! Every variant is terminal: a run that hits one is abandoned and must be
//! re-invoked from scratch. Nothing here is retried.

use bootdist_schema::SpecError;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compile::CompileError;

#[derive(Error, Debug)]
pub enum PackagingError {
    /// Malformed dist spec, missing script, unreadable icon.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The compiler rejected internally synthesized source.
    #[error(transparent)]
    Compilation(#[from] CompileError),

    /// The external freezer failed.
    #[error("Freezer failed: {0:#}")]
    Freeze(anyhow::Error),

    #[error("IO error at {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl PackagingError {
    /// Create a configuration error from anything printable.
    pub fn configuration(msg: impl std::fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Adapter for `map_err` that attaches the path being worked on.
    pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::IoAt {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<SpecError> for PackagingError {
    fn from(err: SpecError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T, E = PackagingError> = std::result::Result<T, E>;
