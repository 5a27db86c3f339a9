//! bootdist - self-updating distribution packager
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Packages a frozen application into a version directory plus a bootstrap
//! directory whose loaders survive every update.
//!
//! # Directory Layout
//!
//! ```text
//! dist/
//! ├── example-1.0.linux-x86_64/   # Full version tier (replaced on update)
//! │   ├── python311.zip
//! │   └── bootdist-files/         # Manifest, runtime identity, completion marker
//! └── bootstrap/                  # Thin bootstrap tier (never changes shape)
//!     ├── example                 # Loader
//!     └── python311.zip           # Bootstrap archive
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bootdist")]
#[command(author, version, about = "bootdist - package self-updating distributions")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Freeze an application and build its version and bootstrap directories
    Build {
        /// Dist spec file
        #[arg(default_value = "bootdist.toml")]
        spec: PathBuf,
        /// Distribution root to write into
        #[arg(long, short, default_value = "dist")]
        out: PathBuf,
        /// Freezer program (defaults to $BOOTDIST_FREEZER)
        #[arg(long)]
        freezer: Option<String>,
        /// Compiler program (defaults to $BOOTDIST_COMPILER)
        #[arg(long)]
        compiler: Option<String>,
        /// Target platform as <os>-<arch> (defaults to the host)
        #[arg(long)]
        platform: Option<String>,
    },
    /// Show which artifact names belong in the bootstrap tier
    Classify {
        /// Artifact names to classify
        #[arg(required = true)]
        names: Vec<String>,
        /// Take the runtime profile and extra includes from a dist spec
        #[arg(long)]
        spec: Option<PathBuf>,
        /// Module built into the runtime (repeatable)
        #[arg(long = "builtin")]
        builtins: Vec<String>,
    },
    /// List the entries of an archive
    Inspect {
        /// Archive to inspect
        archive: PathBuf,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalise freezer option names (target-dir -> targetDir)
    Normalize {
        /// Option names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Plan (and perform) the hand-off to a version directory's runtime
    Chainload {
        /// Version directory to start
        #[arg(long)]
        target: PathBuf,
        /// Runtime identity of the running loader
        #[arg(long)]
        identity: String,
        /// Allow re-executing into a different runtime
        #[arg(long)]
        enable: bool,
        /// Argument vector of the loader, program name first
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        argv: Vec<String>,
    },
}
