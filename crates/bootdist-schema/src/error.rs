//! Dist spec errors

use thiserror::Error;

/// Errors raised while parsing or validating a dist spec.
///
/// All of these are configuration errors: they are reported before any
/// output is written and abort the packaging run.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The TOML document could not be parsed into a [`DistSpec`](crate::DistSpec).
    #[error("Failed to parse dist spec: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(String),

    /// The dist spec declares no executables at all.
    #[error("Dist spec declares no executables")]
    NoExecutables,

    /// Two executables share a name.
    #[error("Duplicate executable name: {0}")]
    DuplicateExecutable(String),

    /// An executable name is not a plain file name.
    #[error("Invalid executable name '{0}': must be a plain file name without path separators")]
    InvalidExecutableName(String),

    /// A freezer option has a value of the wrong shape.
    #[error("Invalid freezer option '{name}': {reason}")]
    InvalidOption {
        /// Option name as written in the dist spec.
        name: String,
        /// What was wrong with it.
        reason: String,
    },
}
