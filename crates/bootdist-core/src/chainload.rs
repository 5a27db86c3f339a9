//! Chainload fallback.
//!
//! A loader can only run a version in-process when both were built against
//! the same runtime. When the identity recorded in the target version
//! directory differs, the loader hands off to that version's own binary
//! instead, carrying the original argument vector across. The hand-off is
//! off unless a distribution opts in.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PackagingError, Result};
use crate::layout::read_runtime_identity;

/// Environment variable carrying the marshalled argument vector to the
/// chainloaded process.
pub const ARGV_ENV: &str = "BOOTDIST_CHAINLOAD_ARGV";

/// Whether a loader may re-exec into another runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainloadPolicy {
    pub enabled: bool,
}

impl ChainloadPolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// What a loader should do to start a target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainloadPlan {
    /// Runtimes match; load the target in this process.
    InProcess,
    /// Replace this process with `runtime`, passing `args`.
    Reexec { runtime: PathBuf, args: Vec<String> },
    /// In-process loading is unsafe and no hand-off is possible.
    Unsupported { reason: String },
}

/// Plans and performs the hand-off for one loader.
#[derive(Debug, Clone)]
pub struct Chainloader {
    policy: ChainloadPolicy,
    current_identity: String,
}

impl Chainloader {
    /// `current_identity` is the runtime identity the loader was built with.
    pub fn new(policy: ChainloadPolicy, current_identity: impl Into<String>) -> Self {
        Self {
            policy,
            current_identity: current_identity.into(),
        }
    }

    pub fn policy(&self) -> ChainloadPolicy {
        self.policy
    }

    /// Decide how to start the version in `target_dir`.
    ///
    /// `argv[0]` names the running loader; the runtime looked for in
    /// `target_dir` has the same file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorded identity exists but cannot be read.
    pub fn plan(&self, target_dir: &Path, argv: &[String]) -> Result<ChainloadPlan> {
        let Some(target_identity) = read_runtime_identity(target_dir)? else {
            tracing::warn!(dir = %target_dir.display(), "no runtime identity recorded, assuming compatible");
            return Ok(ChainloadPlan::InProcess);
        };
        if target_identity == self.current_identity {
            return Ok(ChainloadPlan::InProcess);
        }
        tracing::debug!(
            current = %self.current_identity,
            target = %target_identity,
            "runtime identity mismatch"
        );
        if !self.policy.enabled {
            return Ok(ChainloadPlan::Unsupported {
                reason: format!(
                    "target runtime {target_identity} differs from {} and chainloading is disabled",
                    self.current_identity
                ),
            });
        }

        let Some(exe_name) = argv.first().and_then(|a| Path::new(a).file_name()) else {
            return Ok(ChainloadPlan::Unsupported {
                reason: "argument vector has no program name".to_string(),
            });
        };
        let runtime = target_dir.join(exe_name);
        if !runtime.is_file() {
            return Ok(ChainloadPlan::Unsupported {
                reason: format!("no runtime binary at {}", runtime.display()),
            });
        }
        Ok(ChainloadPlan::Reexec {
            runtime,
            args: argv.iter().skip(1).cloned().collect(),
        })
    }

    /// Perform a [`ChainloadPlan::Reexec`]. Only returns on failure.
    ///
    /// The full argument vector, `argv[0]` included, is also exported in
    /// [`ARGV_ENV`] so the target can restore it exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Configuration`] for any other plan, or an
    /// I/O error if the runtime cannot be started.
    pub fn exec(plan: &ChainloadPlan, argv: &[String]) -> Result<Infallible> {
        let ChainloadPlan::Reexec { runtime, args } = plan else {
            return Err(PackagingError::configuration(format!(
                "nothing to execute for plan {plan:?}"
            )));
        };
        let mut cmd = Command::new(runtime);
        cmd.args(args).env(ARGV_ENV, marshal_argv(argv));
        tracing::info!(runtime = %runtime.display(), "chainloading");
        hand_off(&mut cmd, runtime)
    }
}

#[cfg(unix)]
fn hand_off(cmd: &mut Command, runtime: &Path) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;
    let err = cmd.exec();
    Err(PackagingError::io_at(runtime)(err))
}

#[cfg(not(unix))]
fn hand_off(cmd: &mut Command, runtime: &Path) -> Result<Infallible> {
    let status = cmd.status().map_err(PackagingError::io_at(runtime))?;
    std::process::exit(status.code().unwrap_or(1))
}

/// Encode an argument vector as a list literal: every argument is
/// double-quoted with `\` and `"` backslash-escaped.
pub fn marshal_argv(argv: &[String]) -> String {
    let quoted: Vec<String> = argv
        .iter()
        .map(|arg| format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("[{}]", quoted.join(","))
}

/// Decode the output of [`marshal_argv`].
///
/// # Errors
///
/// Returns [`PackagingError::Configuration`] if `text` is not a marshalled
/// argument vector.
pub fn unmarshal_argv(text: &str) -> Result<Vec<String>> {
    let malformed = || PackagingError::configuration(format!("malformed argument vector: {text}"));
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let mut out = Vec::new();
    let mut chars = inner.chars();
    loop {
        match chars.next() {
            None => break,
            Some('"') => {}
            Some(_) => return Err(malformed()),
        }
        let mut arg = String::new();
        loop {
            match chars.next() {
                Some('\\') => arg.push(chars.next().ok_or_else(malformed)?),
                Some('"') => break,
                Some(c) => arg.push(c),
                None => return Err(malformed()),
            }
        }
        out.push(arg);
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(_) => return Err(malformed()),
        }
    }
    Ok(out)
}
