//! Core data types: artifacts, executables and the files a dist spec copies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named, immutable byte payload: compiled bytecode, a synthesized stub,
/// or a file lifted out of an archive.
///
/// There are no mutating accessors. Ownership passes from the stage that
/// produced it to whichever archive writer persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    logical_name: String,
    payload: Vec<u8>,
}

impl Artifact {
    /// Create an artifact from a logical name and its payload.
    pub fn new(logical_name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            logical_name: logical_name.into(),
            payload: payload.into(),
        }
    }

    /// Name the artifact is stored and looked up under.
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

fn default_true() -> bool {
    true
}

/// One `[[executable]]` entry of a dist spec.
///
/// Consumed read-only by the freezer, the loader injector and the bootstrap
/// archive assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutableSpec {
    /// File name of the produced executable (e.g. `example` or `example.exe`).
    pub name: String,
    /// Entry-point script handed to the freezer.
    pub script: PathBuf,
    /// Icon resource embedded by the freezer, if any.
    #[serde(default)]
    pub icon: Option<PathBuf>,
    /// Build against the GUI subsystem where the platform distinguishes one.
    #[serde(default)]
    pub gui_only: bool,
    /// Whether a bootstrap loader is produced for this executable.
    #[serde(default = "default_true")]
    pub include_in_bootstrap_env: bool,
    /// Extra per-executable options passed through to the freezer verbatim.
    #[serde(default)]
    pub extra_options: BTreeMap<String, toml::Value>,
}

impl ExecutableSpec {
    /// Create a spec with default flags (console, included in bootstrap env).
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            icon: None,
            gui_only: false,
            include_in_bootstrap_env: true,
            extra_options: BTreeMap::new(),
        }
    }

    /// Executable name without its extension (`app.exe` -> `app`).
    ///
    /// A leading dot does not start an extension, so `.hidden` stays whole.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// A file copied verbatim into the version directory after freezing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    /// Source path on the packaging host.
    pub source: PathBuf,
    /// Destination, relative to the version directory.
    pub dest: PathBuf,
}

/// A file appended to the full archive under a chosen entry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageData {
    /// Source path on the packaging host.
    pub source: PathBuf,
    /// Entry name inside the full archive.
    pub name: String,
}

/// Forces one module to be resolved via alternate search paths when the
/// freezer runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPathOverride {
    /// Module whose search path is overridden.
    pub module: String,
    /// Paths searched before the module's own.
    pub paths: Vec<PathBuf>,
}
