//! Dist spec parsing.
//!
//! A dist spec (`bootdist.toml`) declares the application's identity, its
//! executables, freezer options and the extra files that ride along. Paths in
//! the file are relative to the file's own directory; call
//! [`DistSpec::resolve_paths`] after loading to make them absolute.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::error::SpecError;
use crate::options::FreezerOptions;
use crate::types::{DataFile, ExecutableSpec, PackageData, SearchPathOverride};

/// Top-level dist spec parsed from a `bootdist.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DistSpec {
    /// Identity and packaging strategy.
    pub dist: DistSection,
    /// Executables to freeze.
    #[serde(default, rename = "executable")]
    pub executables: Vec<ExecutableSpec>,
    /// Raw freezer options, normalised by [`DistSpec::freezer_options`].
    #[serde(default)]
    pub freezer_options: BTreeMap<String, toml::Value>,
    /// Files copied into the version directory.
    #[serde(default, rename = "data-file")]
    pub data_files: Vec<DataFile>,
    /// Files appended to the full archive.
    #[serde(default, rename = "package-data")]
    pub package_data: Vec<PackageData>,
    /// Module search-path overrides applied while freezing.
    #[serde(default, rename = "search-path-override")]
    pub search_path_overrides: Vec<SearchPathOverride>,
    /// Runtime the frozen application runs on.
    #[serde(default)]
    pub runtime: RuntimeSection,
}

/// The `[runtime]` section of a dist spec.
///
/// Describes the language runtime bundled by the freezer; it decides the
/// full archive name and which shared libraries are bootstrap-tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeSection {
    /// Runtime library stem (e.g. `python`).
    #[serde(default = "default_runtime_name")]
    pub name: String,
    /// Runtime version, `major.minor`.
    #[serde(default = "default_runtime_version")]
    pub version: String,
    /// Modules compiled into the runtime itself rather than shipped as files.
    #[serde(default)]
    pub builtin_modules: Vec<String>,
}

fn default_runtime_name() -> String {
    "python".to_string()
}

fn default_runtime_version() -> String {
    "3.11".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            name: default_runtime_name(),
            version: default_runtime_version(),
            builtin_modules: Vec::new(),
        }
    }
}

/// The `[dist]` section of a dist spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DistSection {
    /// Application name; bound into the bootstrap program.
    pub name: String,
    /// Version string; part of the version directory name.
    pub version: String,
    /// Compile the bootstrap program into standalone executables instead of
    /// shipping stub binaries plus a bootstrap archive.
    #[serde(default)]
    pub compile_bootstrap_exes: bool,
    /// Allow the loader to re-exec a matching runtime when the target version
    /// is binary-incompatible.
    #[serde(default)]
    pub enable_chainload: bool,
    /// File holding the bootstrap logic source.
    pub bootstrap_logic: PathBuf,
    /// Optional file of custom code appended to the bootstrap program.
    #[serde(default)]
    pub bootstrap_code: Option<PathBuf>,
    /// Modules the freezer must include.
    #[serde(default)]
    pub includes: Vec<String>,
    /// Modules the freezer must leave out.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Full-archive entries always copied into the bootstrap archive.
    #[serde(default)]
    pub bootstrap_includes: Vec<String>,
}

impl DistSpec {
    /// Parse a dist spec from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Parse`] if the text is not a valid dist spec.
    pub fn from_toml_str(content: &str) -> Result<Self, SpecError> {
        Ok(toml::from_str(content)?)
    }

    /// Make every relative path in the dist spec absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.dist.bootstrap_logic);
        if let Some(code) = self.dist.bootstrap_code.as_mut() {
            resolve(code);
        }
        for exe in &mut self.executables {
            resolve(&mut exe.script);
            if let Some(icon) = exe.icon.as_mut() {
                resolve(icon);
            }
        }
        for file in &mut self.data_files {
            resolve(&mut file.source);
        }
        for data in &mut self.package_data {
            resolve(&mut data.source);
        }
        for entry in &mut self.search_path_overrides {
            entry.paths.iter_mut().for_each(resolve);
        }
    }

    /// Check the dist spec for structural problems.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::EmptyField`] if the name or version is blank,
    /// [`SpecError::NoExecutables`] if no executable is declared,
    /// [`SpecError::InvalidExecutableName`] if a name is not a plain file
    /// name, or [`SpecError::DuplicateExecutable`] if two executables
    /// share a name.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.dist.name.trim().is_empty() {
            return Err(SpecError::EmptyField("dist.name".to_string()));
        }
        if self.dist.version.trim().is_empty() {
            return Err(SpecError::EmptyField("dist.version".to_string()));
        }
        if self.executables.is_empty() {
            return Err(SpecError::NoExecutables);
        }
        if self.runtime.name.trim().is_empty() {
            return Err(SpecError::EmptyField("runtime.name".to_string()));
        }

        let mut seen = HashSet::new();
        for exe in &self.executables {
            if exe.name.is_empty() {
                return Err(SpecError::EmptyField("executable.name".to_string()));
            }
            if exe.name.contains(['/', '\\']) || !is_plain_file_name(&exe.name) {
                return Err(SpecError::InvalidExecutableName(exe.name.clone()));
            }
            if !seen.insert(exe.name.as_str()) {
                return Err(SpecError::DuplicateExecutable(exe.name.clone()));
            }
        }
        Ok(())
    }

    /// Normalised freezer options for this spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidOption`] if a list-valued option is
    /// malformed.
    pub fn freezer_options(&self) -> Result<FreezerOptions, SpecError> {
        FreezerOptions::from_spec(
            &self.dist.includes,
            &self.dist.excludes,
            &self.freezer_options,
        )
    }

    /// Executables that get a bootstrap loader.
    pub fn bootstrap_executables(&self) -> impl Iterator<Item = &ExecutableSpec> {
        self.executables
            .iter()
            .filter(|exe| exe.include_in_bootstrap_env)
    }
}

/// A single ordinary path component: not `.`, `..` or a drive prefix.
fn is_plain_file_name(name: &str) -> bool {
    let mut parts = Path::new(name).components();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(_)), None)
    )
}
