//! Compiled artifact production.
//!
//! Synthesized source is handed to a [`Compiler`] collaborator. The source is
//! generated internally and trusted to be valid, so a rejection is a defect in
//! the packaging tool rather than bad user input; it surfaces unchanged as a
//! [`CompileError`] and ends the run.

use bootdist_schema::{Artifact, ExecutableSpec};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::io::process::{run_with_stdin, tail_lines};

/// How many lines of compiler stderr are kept in an error.
const STDERR_TAIL: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Compilation of '{logical_name}' failed: {message}")]
pub struct CompileError {
    pub logical_name: String,
    pub message: String,
}

impl CompileError {
    pub fn new(logical_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            logical_name: logical_name.into(),
            message: message.to_string(),
        }
    }
}

/// Turns source text into loadable bytes or standalone binaries.
///
/// Implementations must be deterministic: identical source and name give
/// identical bytes, which keeps bootstrap archives reproducible.
pub trait Compiler: Send + Sync {
    /// Compile `source` into an intermediate artifact payload.
    fn compile(&self, source: &str, logical_name: &str) -> Result<Vec<u8>, CompileError>;

    /// Compile `source` into a standalone executable for `exe` at `dest`.
    fn compile_executable(
        &self,
        source: &str,
        exe: &ExecutableSpec,
        dest: &Path,
    ) -> Result<(), CompileError>;
}

/// Compile `source` and wrap the result as an [`Artifact`] named
/// `logical_name`.
///
/// # Errors
///
/// Returns the collaborator's [`CompileError`] unchanged.
pub fn compile_artifact(
    compiler: &dyn Compiler,
    source: &str,
    logical_name: &str,
) -> Result<Artifact, CompileError> {
    let payload = compiler.compile(source, logical_name)?;
    tracing::debug!(logical_name, bytes = payload.len(), "compiled artifact");
    Ok(Artifact::new(logical_name, payload))
}

/// [`Compiler`] backed by an external program.
///
/// Protocol: source arrives on stdin.
///
/// - `<program> [args] --name <logical_name>` writes the compiled payload to
///   stdout.
/// - `<program> [args] --exe --name <exe name> --output <dest>` writes a
///   standalone binary to `dest`.
///
/// A non-zero exit is a compilation failure; the tail of stderr becomes the
/// error message.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Fixed arguments placed before the protocol arguments.
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

    /// Load from `BOOTDIST_COMPILER` and optional whitespace-separated
    /// `BOOTDIST_COMPILER_ARGS`.
    pub fn from_env() -> Option<Self> {
        let program = std::env::var("BOOTDIST_COMPILER").ok()?;
        let args = std::env::var("BOOTDIST_COMPILER_ARGS").unwrap_or_default();
        Some(Self::new(program).with_args(args.split_whitespace()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(
        &self,
        logical_name: &str,
        extra: &[OsString],
        source: &str,
    ) -> Result<Vec<u8>, CompileError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(extra);

        tracing::debug!(program = %self.program.display(), logical_name, "invoking compiler");
        let output = run_with_stdin(&mut cmd, source.as_bytes()).map_err(|e| {
            CompileError::new(
                logical_name,
                format!("could not run {}: {e}", self.program.display()),
            )
        })?;

        if !output.status.success() {
            let stderr = tail_lines(&output.stderr, STDERR_TAIL);
            return Err(CompileError::new(
                logical_name,
                format!("compiler exited with {}: {stderr}", output.status),
            ));
        }
        Ok(output.stdout)
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, source: &str, logical_name: &str) -> Result<Vec<u8>, CompileError> {
        let extra = [OsString::from("--name"), OsString::from(logical_name)];
        self.invoke(logical_name, &extra, source)
    }

    fn compile_executable(
        &self,
        source: &str,
        exe: &ExecutableSpec,
        dest: &Path,
    ) -> Result<(), CompileError> {
        let extra = [
            OsString::from("--exe"),
            OsString::from("--name"),
            OsString::from(&exe.name),
            OsString::from("--output"),
            dest.as_os_str().to_owned(),
        ];
        self.invoke(&exe.name, &extra, source)?;
        if !dest.is_file() {
            return Err(CompileError::new(
                &exe.name,
                format!("compiler reported success but {} is missing", dest.display()),
            ));
        }
        Ok(())
    }
}
