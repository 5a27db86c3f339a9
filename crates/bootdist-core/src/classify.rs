//! Bootstrap-tier dependency classification.
//!
//! The classifier is a pure predicate over artifact names. It never looks at
//! the filesystem: callers hand it an explicit listing taken once after the
//! freezer finishes, so classification cannot interleave with writes and two
//! runs over the same listing always agree.

use bootdist_schema::{Platform, RuntimeSection};
use regex::Regex;
use std::collections::BTreeSet;

/// Prefix of the POSIX file-control primitive the loader needs before it can
/// locate a version directory.
const FILE_CONTROL_MODULE: &str = "fcntl";

/// The language runtime a distribution is frozen against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProfile {
    /// Library stem, e.g. `python`.
    pub name: String,
    /// `major.minor` version string.
    pub version: String,
    /// Modules compiled into the runtime itself.
    pub builtin_modules: BTreeSet<String>,
}

impl RuntimeProfile {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            builtin_modules: BTreeSet::new(),
        }
    }

    pub fn with_builtin(mut self, module: impl Into<String>) -> Self {
        self.builtin_modules.insert(module.into());
        self
    }

    /// Whether `module` is built into the runtime rather than shipped as a file.
    pub fn is_builtin(&self, module: &str) -> bool {
        self.builtin_modules.contains(module)
    }

    /// File name of the full (and bootstrap) archive: `python311.zip`.
    pub fn archive_name(&self) -> String {
        let digits: String = self.version.split('.').take(2).collect();
        format!("{}{digits}.zip", self.name)
    }

    /// Identity string a loader compares against before loading in-process.
    pub fn identity(&self, platform: &Platform) -> String {
        format!("{}-{}-{}", self.name, self.version, platform.tag())
    }
}

impl From<&RuntimeSection> for RuntimeProfile {
    fn from(section: &RuntimeSection) -> Self {
        Self {
            name: section.name.clone(),
            version: section.version.clone(),
            builtin_modules: section.builtin_modules.iter().cloned().collect(),
        }
    }
}

impl Default for RuntimeProfile {
    fn default() -> Self {
        Self::from(&RuntimeSection::default())
    }
}

/// Decides bootstrap-tier membership for artifact names.
#[derive(Debug, Clone)]
pub struct Classifier {
    profile: RuntimeProfile,
    runtime_library: Regex,
    extra: BTreeSet<String>,
}

impl Classifier {
    /// Build a classifier for `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime library pattern cannot be compiled.
    pub fn new(profile: RuntimeProfile) -> Result<Self, regex::Error> {
        let pattern = format!(r"^(lib)?{}\d[\d.]*\.[a-z.]*$", regex::escape(&profile.name));
        Ok(Self {
            runtime_library: Regex::new(&pattern)?,
            profile,
            extra: BTreeSet::new(),
        })
    }

    /// Names that are bootstrap-tier regardless of the built-in policy.
    pub fn with_extra<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn profile(&self) -> &RuntimeProfile {
        &self.profile
    }

    /// Whether `name` belongs in the bootstrap tier.
    ///
    /// True for the file-control primitive when the runtime does not build
    /// it in, for the runtime's own shared library, for private C runtime
    /// assemblies, and for any explicitly listed extra name.
    pub fn is_bootstrap_dependency(&self, name: &str) -> bool {
        if self.extra.contains(name) {
            return true;
        }
        if name.starts_with(FILE_CONTROL_MODULE) && !self.profile.is_builtin(FILE_CONTROL_MODULE)
        {
            return true;
        }
        is_always_core(name, &self.runtime_library)
    }

    /// Filter a post-freeze listing down to the bootstrap-tier names.
    pub fn select<'a, I>(&self, listing: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        listing
            .into_iter()
            .filter(|name| self.is_bootstrap_dependency(name))
            .map(str::to_string)
            .collect()
    }
}

/// Platform-independent core classification: the runtime library itself and
/// the private C runtime assembly shipped next to it.
fn is_always_core(name: &str, runtime_library: &Regex) -> bool {
    if runtime_library.is_match(name) {
        return true;
    }
    name.starts_with("Microsoft.") && name.ends_with(".CRT")
}
