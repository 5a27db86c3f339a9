//! Shared types and the dist spec format for bootdist.
//!
//! Everything in this crate is plain data: no filesystem writes, no process
//! spawning. The packaging pipeline itself lives in `bootdist-core`.

pub mod dist;
pub mod error;
pub mod hash;
pub mod options;
pub mod platform;
pub mod types;

// Re-exports
pub use dist::{DistSection, DistSpec, RuntimeSection};
pub use error::SpecError;
pub use hash::*;
pub use options::{FreezerOptions, normalise_option_name};
pub use platform::*;
pub use types::*;

/// Name of the runtime support package every frozen distribution must carry.
pub const RUNTIME_SUPPORT_PACKAGE: &str = "bootdist";

/// Alternate-runtime package that is excluded from freezing unless a dist
/// spec mentions it explicitly.
pub const ALTERNATE_RUNTIME_PACKAGE: &str = "pypy";
