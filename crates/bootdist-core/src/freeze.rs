//! Freezer collaborator.
//!
//! The freezer turns application scripts into native binaries plus a full
//! archive of their dependencies inside the version directory. bootdist never
//! freezes anything itself; it describes the job in a [`FreezeRequest`] and
//! reads back the directory listing the freezer left behind.

use anyhow::{Context, bail};
use bootdist_schema::{ExecutableSpec, FreezerOptions, Platform, SearchPathOverride};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::io::process::{run_with_stdin, tail_lines};

/// Packages forced into the full archive even when the freezer would leave
/// them loose.
pub const DEFAULT_ZIP_INCLUDE_PACKAGES: &[&str] = &["encodings"];

const STDERR_TAIL: usize = 40;

/// One executable as the freezer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeExecutable {
    pub script: PathBuf,
    pub target_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// Binary base, e.g. `Win32GUI` for GUI-only executables on Windows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl FreezeExecutable {
    pub fn from_spec(exe: &ExecutableSpec, platform: &Platform) -> Self {
        Self {
            script: exe.script.clone(),
            target_name: exe.name.clone(),
            icon: exe.icon.clone(),
            base: if exe.gui_only {
                platform.gui_base().map(str::to_string)
            } else {
                None
            },
            extra: exe.extra_options.clone(),
        }
    }
}

/// Everything the freezer needs for one run. Serialized as JSON for
/// [`CommandFreezer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeRequest {
    pub executables: Vec<FreezeExecutable>,
    #[serde(flatten)]
    pub options: FreezerOptions,
    pub target_dir: PathBuf,
    pub zip_include_packages: Vec<String>,
    /// Modules resolved through alternate search paths while freezing.
    pub search_path_overrides: Vec<SearchPathOverride>,
    /// File name of the full archive inside `target_dir`.
    pub archive_name: String,
}

impl FreezeRequest {
    pub fn new(
        executables: Vec<FreezeExecutable>,
        options: FreezerOptions,
        target_dir: impl Into<PathBuf>,
        archive_name: impl Into<String>,
    ) -> Self {
        Self {
            executables,
            options,
            target_dir: target_dir.into(),
            zip_include_packages: DEFAULT_ZIP_INCLUDE_PACKAGES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            search_path_overrides: Vec::new(),
            archive_name: archive_name.into(),
        }
    }

    pub fn with_search_path_overrides(mut self, overrides: Vec<SearchPathOverride>) -> Self {
        self.search_path_overrides = overrides;
        self
    }

    /// Path of the full archive the freezer is expected to produce.
    pub fn archive_path(&self) -> PathBuf {
        self.target_dir.join(&self.archive_name)
    }
}

/// What the freezer left in the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeOutput {
    /// Top-level entry names of the target directory, sorted.
    pub listing: Vec<String>,
    pub archive_name: String,
}

impl FreezeOutput {
    /// Take the post-freeze listing of `dir`. Only the top level is listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn scan(dir: &Path, archive_name: impl Into<String>) -> anyhow::Result<Self> {
        let mut listing = Vec::new();
        for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            listing.push(entry.file_name().to_string_lossy().into_owned());
        }
        listing.sort();
        Ok(Self {
            listing,
            archive_name: archive_name.into(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.listing.iter().map(String::as_str)
    }
}

/// Freezes application code into the target directory.
pub trait Freezer: Send + Sync {
    /// Run the freezer. On success the target directory holds the frozen
    /// binaries and the full archive.
    ///
    /// # Errors
    ///
    /// Any failure of the freezer; the packaging run ends.
    fn freeze(&self, request: &FreezeRequest) -> anyhow::Result<FreezeOutput>;
}

/// [`Freezer`] backed by an external program that reads a JSON
/// [`FreezeRequest`] on stdin.
#[derive(Debug, Clone)]
pub struct CommandFreezer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandFreezer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Resolve `program` on `PATH` (or accept it as a path).
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be found.
    pub fn locate(program: &str) -> Result<Self, which::Error> {
        Ok(Self::new(which::which(program)?))
    }

    /// Load from `BOOTDIST_FREEZER` and optional whitespace-separated
    /// `BOOTDIST_FREEZER_ARGS`.
    pub fn from_env() -> Option<Self> {
        let program = std::env::var("BOOTDIST_FREEZER").ok()?;
        let args = std::env::var("BOOTDIST_FREEZER_ARGS").unwrap_or_default();
        Some(Self::new(program).with_args(args.split_whitespace()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Freezer for CommandFreezer {
    fn freeze(&self, request: &FreezeRequest) -> anyhow::Result<FreezeOutput> {
        let payload = serde_json::to_vec(request).context("failed to encode freeze request")?;
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&request.target_dir);

        tracing::info!(program = %self.program.display(), target = %request.target_dir.display(), "running freezer");
        let output = run_with_stdin(&mut cmd, &payload)
            .with_context(|| format!("could not run freezer {}", self.program.display()))?;
        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                tail_lines(&output.stderr, STDERR_TAIL)
            );
        }
        FreezeOutput::scan(&request.target_dir, &request.archive_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn windows() -> Platform {
        "win-x86_64".parse().unwrap()
    }

    #[test]
    fn gui_executables_get_platform_base() {
        let mut exe = ExecutableSpec::new("app.exe", "app.py");
        exe.gui_only = true;
        assert_eq!(
            FreezeExecutable::from_spec(&exe, &windows()).base.as_deref(),
            Some("Win32GUI")
        );
        let linux: Platform = "linux-x86_64".parse().unwrap();
        assert_eq!(FreezeExecutable::from_spec(&exe, &linux).base, None);
        exe.gui_only = false;
        assert_eq!(FreezeExecutable::from_spec(&exe, &windows()).base, None);
    }

    #[test]
    fn request_serializes_for_the_freezer() {
        let mut exe = ExecutableSpec::new("app", "app.py");
        exe.extra_options
            .insert("initScript".into(), toml::Value::String("Console".into()));
        let options = FreezerOptions::from_spec(
            &[],
            &[],
            &BTreeMap::from([("optimize".to_string(), toml::Value::Integer(2))]),
        )
        .unwrap();
        let request = FreezeRequest::new(
            vec![FreezeExecutable::from_spec(&exe, &windows())],
            options,
            "/out",
            "python311.zip",
        )
        .with_search_path_overrides(vec![SearchPathOverride {
            module: "distutils".into(),
            paths: vec!["/alt".into()],
        }]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["targetDir"], "/out");
        assert_eq!(json["archiveName"], "python311.zip");
        assert_eq!(json["zipIncludePackages"][0], "encodings");
        assert_eq!(json["optimizeFlag"], 2);
        assert_eq!(json["includes"][0], "bootdist");
        assert_eq!(json["excludes"][0], "pypy");
        assert_eq!(json["executables"][0]["targetName"], "app");
        assert_eq!(json["executables"][0]["initScript"], "Console");
        assert_eq!(json["searchPathOverrides"][0]["module"], "distutils");
        assert_eq!(request.archive_path(), PathBuf::from("/out/python311.zip"));
    }

    #[test]
    fn scan_lists_top_level_sorted() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("zeta"), "").unwrap();
        std::fs::write(tmp.path().join("alpha"), "").unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/nested")).unwrap();
        let output = FreezeOutput::scan(tmp.path(), "python311.zip").unwrap();
        assert_eq!(output.listing, vec!["alpha", "lib", "zeta"]);
        assert_eq!(output.names().collect::<Vec<_>>(), ["alpha", "lib", "zeta"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_freezer_reads_request_and_lists_output() {
        let tmp = tempdir().unwrap();
        // Save the request and produce one binary in the working directory.
        let freezer = CommandFreezer::new("sh").with_args([
            "-c",
            "cat > request.json && printf bin > app",
            "freezer",
        ]);
        let request = FreezeRequest::new(vec![], FreezerOptions::default(), tmp.path(), "lib.zip");
        let output = freezer.freeze(&request).unwrap();
        assert_eq!(output.listing, vec!["app", "request.json"]);
        let saved = std::fs::read_to_string(tmp.path().join("request.json")).unwrap();
        assert!(saved.contains("\"archiveName\":\"lib.zip\""));
    }

    #[cfg(unix)]
    #[test]
    fn command_freezer_failure_carries_stderr() {
        let tmp = tempdir().unwrap();
        let freezer =
            CommandFreezer::new("sh").with_args(["-c", "echo 'no module named app' >&2; exit 2"]);
        let request = FreezeRequest::new(vec![], FreezerOptions::default(), tmp.path(), "lib.zip");
        let err = freezer.freeze(&request).unwrap_err();
        assert!(format!("{err:#}").contains("no module named app"));
    }
}
