//! Loader injection.
//!
//! Every executable that takes part in the bootstrap environment gets
//! exactly one loader in the bootstrap directory. How it is produced is
//! decided once per run by [`LoaderMode`].

use bootdist_schema::{Artifact, ExecutableSpec, Platform};
use std::path::{Path, PathBuf};

use crate::compile::{Compiler, compile_artifact};
use crate::error::{PackagingError, Result};
use crate::layout::DistLayout;
use crate::manifest::BootstrapManifest;

/// Body of every main stub: import the bootstrap module and run it.
pub const MAIN_STUB_SOURCE: &str = "import bootstrap_module\nbootstrap_module.bootstrap()";

/// How loaders are produced for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderMode {
    /// Compile the bootstrap program into a standalone binary per executable.
    DirectCompile,
    /// Ship the frozen binary unmodified plus a bootstrap archive holding the
    /// bootstrap module and one main stub per executable.
    StubPlusArchive,
}

impl LoaderMode {
    /// Mode for the dist spec's `compile-bootstrap-exes` flag.
    pub fn from_flag(compile_bootstrap_exes: bool) -> Self {
        if compile_bootstrap_exes {
            Self::DirectCompile
        } else {
            Self::StubPlusArchive
        }
    }

    /// Whether the bootstrap program must end with the entry invocation.
    pub fn invokes_entry(self) -> bool {
        matches!(self, Self::StubPlusArchive)
    }
}

impl std::fmt::Display for LoaderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectCompile => write!(f, "direct-compile"),
            Self::StubPlusArchive => write!(f, "stub+archive"),
        }
    }
}

/// The loader produced for one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// A standalone compiled loader.
    Standalone { binary: PathBuf },
    /// The frozen binary plus its main stub, destined for the bootstrap
    /// archive.
    Stub {
        binary: PathBuf,
        main_artifact: Artifact,
    },
}

impl EntryPoint {
    /// Loader binary in the bootstrap directory.
    pub fn binary(&self) -> &Path {
        match self {
            Self::Standalone { binary } | Self::Stub { binary, .. } => binary,
        }
    }

    pub fn main_artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Standalone { .. } => None,
            Self::Stub { main_artifact, .. } => Some(main_artifact),
        }
    }
}

/// Copies embedded resources (icon, version metadata) from one binary onto
/// another.
pub trait ResourceTransplanter: Send + Sync {
    /// Copy resources from `from` onto `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if either binary cannot be read or written.
    fn transplant(&self, from: &Path, to: &Path) -> std::io::Result<()>;
}

/// Transplanter for platforms without embedded resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransplant;

impl ResourceTransplanter for NoTransplant {
    fn transplant(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        tracing::debug!(from = %from.display(), to = %to.display(), "no resources to transplant");
        Ok(())
    }
}

/// Archive entry name of an executable's main stub: `app.exe` -> `app_main`.
pub fn main_artifact_name(exe: &ExecutableSpec) -> String {
    format!("{}_main", exe.stem())
}

/// File name the freezer gives `exe` on `platform`.
pub fn binary_name(exe: &ExecutableSpec, platform: &Platform) -> String {
    let suffix = platform.exe_suffix();
    if suffix.is_empty() || exe.name.to_ascii_lowercase().ends_with(suffix) {
        exe.name.clone()
    } else {
        format!("{}{suffix}", exe.name)
    }
}

/// Check that every executable's script exists and its icon can be opened.
///
/// Runs before any output is produced.
///
/// # Errors
///
/// Returns [`PackagingError::Configuration`] naming the first bad input.
pub fn check_inputs<'a, I>(executables: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ExecutableSpec>,
{
    for exe in executables {
        if !exe.script.is_file() {
            return Err(PackagingError::configuration(format!(
                "script for executable '{}' not found: {}",
                exe.name,
                exe.script.display()
            )));
        }
        if let Some(icon) = &exe.icon {
            std::fs::File::open(icon).map_err(|e| {
                PackagingError::configuration(format!(
                    "icon for executable '{}' is unreadable ({}): {e}",
                    exe.name,
                    icon.display()
                ))
            })?;
        }
    }
    Ok(())
}

/// Produces loaders in the bootstrap directory.
pub struct LoaderInjector<'a> {
    layout: &'a DistLayout,
    platform: Platform,
    compiler: &'a dyn Compiler,
    transplanter: &'a dyn ResourceTransplanter,
}

impl std::fmt::Debug for LoaderInjector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderInjector")
            .field("layout", &self.layout)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl<'a> LoaderInjector<'a> {
    pub fn new(
        layout: &'a DistLayout,
        platform: Platform,
        compiler: &'a dyn Compiler,
        transplanter: &'a dyn ResourceTransplanter,
    ) -> Self {
        Self {
            layout,
            platform,
            compiler,
            transplanter,
        }
    }

    /// Produce one loader per executable flagged for the bootstrap
    /// environment, in declaration order.
    ///
    /// `source` is the synthesized bootstrap program; it is only compiled in
    /// [`LoaderMode::DirectCompile`].
    ///
    /// # Errors
    ///
    /// Returns the first copy, compile or transplant failure.
    pub fn inject<'e, I>(
        &self,
        mode: LoaderMode,
        source: &str,
        executables: I,
        manifest: &mut BootstrapManifest,
    ) -> Result<Vec<(String, EntryPoint)>>
    where
        I: IntoIterator<Item = &'e ExecutableSpec>,
    {
        let mut out = Vec::new();
        for exe in executables {
            if !exe.include_in_bootstrap_env {
                continue;
            }
            let entry = match mode {
                LoaderMode::DirectCompile => self.inject_direct(exe, source, manifest)?,
                LoaderMode::StubPlusArchive => self.inject_stub(exe, manifest)?,
            };
            tracing::info!(exe = %exe.name, binary = %entry.binary().display(), %mode, "loader ready");
            out.push((exe.name.clone(), entry));
        }
        Ok(out)
    }

    /// Compile the bootstrap program into a standalone loader and carry the
    /// frozen binary's resources over to it.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Configuration`] if the freezer produced no
    /// binary for `exe`, a compilation error, or an I/O error from the
    /// transplant.
    pub fn inject_direct(
        &self,
        exe: &ExecutableSpec,
        source: &str,
        manifest: &mut BootstrapManifest,
    ) -> Result<EntryPoint> {
        let name = binary_name(exe, &self.platform);
        let frozen = self.layout.frozen_path(&name);
        if !frozen.is_file() {
            return Err(PackagingError::configuration(format!(
                "frozen executable {} not found; its resources cannot be carried to the loader",
                frozen.display()
            )));
        }

        let binary = self.layout.bootstrap_path(&name);
        self.compiler.compile_executable(source, exe, &binary)?;
        self.transplanter
            .transplant(&frozen, &binary)
            .map_err(PackagingError::io_at(&binary))?;
        manifest.register(&binary)?;
        Ok(EntryPoint::Standalone { binary })
    }

    /// Copy the frozen binary into the bootstrap directory and compile its
    /// main stub.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the copy or a compilation error.
    pub fn inject_stub(
        &self,
        exe: &ExecutableSpec,
        manifest: &mut BootstrapManifest,
    ) -> Result<EntryPoint> {
        let name = binary_name(exe, &self.platform);
        let binary = self.layout.copy_to_bootstrap_env(&name, manifest)?;
        let main_artifact =
            compile_artifact(self.compiler, MAIN_STUB_SOURCE, &main_artifact_name(exe))?;
        Ok(EntryPoint::Stub {
            binary,
            main_artifact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileError;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Echoes source as payload; writes source to `dest` for executables.
    #[derive(Default)]
    struct Echo {
        exes: Mutex<Vec<String>>,
    }

    impl Compiler for Echo {
        fn compile(&self, source: &str, _: &str) -> std::result::Result<Vec<u8>, CompileError> {
            Ok(source.as_bytes().to_vec())
        }

        fn compile_executable(
            &self,
            source: &str,
            exe: &ExecutableSpec,
            dest: &Path,
        ) -> std::result::Result<(), CompileError> {
            self.exes.lock().unwrap().push(exe.name.clone());
            std::fs::write(dest, source).map_err(|e| CompileError::new(&exe.name, e))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(PathBuf, PathBuf)>>);

    impl ResourceTransplanter for Recorder {
        fn transplant(&self, from: &Path, to: &Path) -> std::io::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((from.to_path_buf(), to.to_path_buf()));
            Ok(())
        }
    }

    fn linux() -> Platform {
        "linux-x86_64".parse().unwrap()
    }

    fn setup(tmp: &Path) -> (DistLayout, Vec<ExecutableSpec>) {
        let layout = DistLayout::new(tmp, "example", "1.0", &linux());
        layout.prepare().unwrap();
        std::fs::write(layout.frozen_path("app"), "frozen-app").unwrap();
        std::fs::write(layout.frozen_path("tool"), "frozen-tool").unwrap();
        let mut tool = ExecutableSpec::new("tool", "tool.py");
        tool.include_in_bootstrap_env = false;
        (layout, vec![ExecutableSpec::new("app", "app.py"), tool])
    }

    #[test]
    fn mode_follows_flag() {
        assert_eq!(LoaderMode::from_flag(true), LoaderMode::DirectCompile);
        assert_eq!(LoaderMode::from_flag(false), LoaderMode::StubPlusArchive);
        assert!(LoaderMode::StubPlusArchive.invokes_entry());
        assert!(!LoaderMode::DirectCompile.invokes_entry());
    }

    #[test]
    fn naming() {
        let exe = ExecutableSpec::new("app.exe", "app.py");
        assert_eq!(main_artifact_name(&exe), "app_main");
        let windows: Platform = "win-x86_64".parse().unwrap();
        assert_eq!(binary_name(&ExecutableSpec::new("app", "a.py"), &windows), "app.exe");
        assert_eq!(binary_name(&exe, &windows), "app.exe");
        assert_eq!(binary_name(&ExecutableSpec::new("app", "a.py"), &linux()), "app");
        assert!(MAIN_STUB_SOURCE.starts_with("import bootstrap_module\n"));
    }

    #[test]
    fn stub_mode_copies_frozen_binary() {
        let tmp = tempdir().unwrap();
        let (layout, exes) = setup(tmp.path());
        let compiler = Echo::default();
        let injector = LoaderInjector::new(&layout, linux(), &compiler, &NoTransplant);
        let mut manifest = BootstrapManifest::new(layout.bootstrap_dir());

        let entries = injector
            .inject(LoaderMode::StubPlusArchive, "unused", &exes, &mut manifest)
            .unwrap();
        assert_eq!(entries.len(), 1);
        let (name, entry) = &entries[0];
        assert_eq!(name, "app");
        assert_eq!(std::fs::read_to_string(entry.binary()).unwrap(), "frozen-app");
        let main = entry.main_artifact().unwrap();
        assert_eq!(main.logical_name(), "app_main");
        assert_eq!(main.payload(), MAIN_STUB_SOURCE.as_bytes());
        assert!(!layout.bootstrap_path("tool").exists());
        assert_eq!(manifest.render(), "app\n");
        assert!(compiler.exes.lock().unwrap().is_empty());
    }

    #[test]
    fn direct_mode_compiles_and_transplants() {
        let tmp = tempdir().unwrap();
        let (layout, exes) = setup(tmp.path());
        let compiler = Echo::default();
        let recorder = Recorder::default();
        let injector = LoaderInjector::new(&layout, linux(), &compiler, &recorder);
        let mut manifest = BootstrapManifest::new(layout.bootstrap_dir());

        let entries = injector
            .inject(LoaderMode::DirectCompile, "bootstrap-src", &exes, &mut manifest)
            .unwrap();
        assert_eq!(entries.len(), 1);
        let (_, entry) = &entries[0];
        assert!(matches!(entry, EntryPoint::Standalone { .. }));
        assert_eq!(
            std::fs::read_to_string(entry.binary()).unwrap(),
            "bootstrap-src"
        );
        assert_eq!(*compiler.exes.lock().unwrap(), vec!["app".to_string()]);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![(layout.frozen_path("app"), layout.bootstrap_path("app"))]
        );
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn direct_mode_requires_frozen_binary() {
        let tmp = tempdir().unwrap();
        let windows: Platform = "win-x86_64".parse().unwrap();
        let layout = DistLayout::new(tmp.path(), "example", "1.0", &windows);
        layout.prepare().unwrap();
        let exes = vec![ExecutableSpec::new("app", "app.py")];
        let compiler = Echo::default();
        let recorder = Recorder::default();
        let injector = LoaderInjector::new(&layout, windows, &compiler, &recorder);
        let mut manifest = BootstrapManifest::new(layout.bootstrap_dir());

        let err = injector
            .inject(LoaderMode::DirectCompile, "bootstrap-src", &exes, &mut manifest)
            .unwrap_err();
        assert!(matches!(err, PackagingError::Configuration(_)));
        assert!(err.to_string().contains("app.exe"));
        assert!(compiler.exes.lock().unwrap().is_empty());
        assert!(recorder.0.lock().unwrap().is_empty());
        assert!(!layout.bootstrap_path("app.exe").exists());
        assert!(manifest.is_empty());
    }

    #[test]
    fn missing_script_is_configuration_error() {
        let tmp = tempdir().unwrap();
        let exe = ExecutableSpec::new("app", tmp.path().join("missing.py"));
        let err = check_inputs([&exe]).unwrap_err();
        assert!(matches!(err, PackagingError::Configuration(_)));
        assert!(err.to_string().contains("missing.py"));
    }

    #[test]
    fn unreadable_icon_is_configuration_error() {
        let tmp = tempdir().unwrap();
        let script = tmp.path().join("app.py");
        std::fs::write(&script, "print('hi')").unwrap();
        let mut exe = ExecutableSpec::new("app", &script);
        check_inputs([&exe]).unwrap();

        exe.icon = Some(tmp.path().join("app.ico"));
        let err = check_inputs([&exe]).unwrap_err();
        assert!(matches!(err, PackagingError::Configuration(_)));
        assert!(err.to_string().contains("app.ico"));
    }
}
