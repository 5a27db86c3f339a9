//! Packaging pipeline.
//!
//! One [`Packager::run`] turns a dist spec into a version directory and a
//! bootstrap directory:
//!
//! 1. validate the dist spec and its inputs (nothing is written before this)
//! 2. reset the output directories
//! 3. freeze, then take the post-freeze listing once
//! 4. copy data files and append package data to the full archive
//! 5. record the runtime identity
//! 6. synthesize the bootstrap program
//! 7. inject loaders, and in stub mode assemble the bootstrap archive
//! 8. write the bootstrap manifest, then the completion marker
//!
//! Steps run strictly in order on the calling thread. Any error ends the run
//! and leaves the completion marker absent.

use bootdist_schema::{DistSpec, Platform};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::ArchiveWriter;
use crate::assemble::{
    AssembledArchive, Assembler, AssemblyInputs, BOOTSTRAP_MODULE, full_archive_names,
};
use crate::classify::{Classifier, RuntimeProfile};
use crate::compile::{Compiler, compile_artifact};
use crate::error::{PackagingError, Result};
use crate::freeze::{FreezeExecutable, FreezeOutput, FreezeRequest, Freezer};
use crate::inject::{
    EntryPoint, LoaderInjector, LoaderMode, NoTransplant, ResourceTransplanter, binary_name,
    check_inputs,
};
use crate::io::copy::copy_path;
use crate::layout::DistLayout;
use crate::manifest::BootstrapManifest;
use crate::reporter::{NullReporter, Reporter};
use crate::synth::{BootstrapLogic, BootstrapSource};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PackagingReport {
    pub version_dir: PathBuf,
    pub bootstrap_dir: PathBuf,
    pub mode: LoaderMode,
    /// Post-freeze listing of the version directory.
    pub listing: Vec<String>,
    /// One loader per bootstrap executable, in declaration order.
    pub entry_points: Vec<(String, EntryPoint)>,
    /// Present in stub mode only.
    pub bootstrap_archive: Option<AssembledArchive>,
    pub manifest: BootstrapManifest,
    pub runtime_identity: String,
}

/// Runs the packaging pipeline for one dist spec.
pub struct Packager<'a> {
    spec: &'a DistSpec,
    layout: DistLayout,
    platform: Platform,
    runtime: RuntimeProfile,
    freezer: &'a dyn Freezer,
    compiler: &'a dyn Compiler,
    transplanter: &'a dyn ResourceTransplanter,
    reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for Packager<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packager")
            .field("dist", &self.spec.dist.name)
            .field("layout", &self.layout)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl<'a> Packager<'a> {
    /// Package `spec` into `dist_root` for the current platform.
    ///
    /// Paths in `spec` must already be resolved.
    pub fn new(
        spec: &'a DistSpec,
        dist_root: &Path,
        freezer: &'a dyn Freezer,
        compiler: &'a dyn Compiler,
    ) -> Self {
        let platform = Platform::current();
        Self {
            layout: DistLayout::new(dist_root, &spec.dist.name, &spec.dist.version, &platform),
            runtime: RuntimeProfile::from(&spec.runtime),
            spec,
            platform,
            freezer,
            compiler,
            transplanter: &NoTransplant,
            reporter: &NullReporter,
        }
    }

    /// Target another platform (version directory name, executable suffix,
    /// GUI base).
    pub fn platform(mut self, platform: Platform) -> Self {
        self.layout = DistLayout::new(
            self.layout.root().to_path_buf(),
            &self.spec.dist.name,
            &self.spec.dist.version,
            &platform,
        );
        self.platform = platform;
        self
    }

    pub fn transplanter(mut self, transplanter: &'a dyn ResourceTransplanter) -> Self {
        self.transplanter = transplanter;
        self
    }

    pub fn reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn layout(&self) -> &DistLayout {
        &self.layout
    }

    /// Run every step. See the [module-level documentation](self).
    ///
    /// # Errors
    ///
    /// Returns the first failure; see [`PackagingError`].
    pub fn run(&self) -> Result<PackagingReport> {
        let started = Instant::now();
        let spec = self.spec;

        self.reporter.section("Checking");
        spec.validate()?;
        let options = spec.freezer_options()?;
        check_inputs(&spec.executables)?;
        let logic = BootstrapLogic::load(&spec.dist.bootstrap_logic).map_err(|e| {
            PackagingError::configuration(format!(
                "bootstrap logic {} is unreadable: {e}",
                spec.dist.bootstrap_logic.display()
            ))
        })?;
        let hook = spec
            .dist
            .bootstrap_code
            .as_deref()
            .map(|path| {
                std::fs::read_to_string(path).map_err(|e| {
                    PackagingError::configuration(format!(
                        "bootstrap code {} is unreadable: {e}",
                        path.display()
                    ))
                })
            })
            .transpose()?;
        let classifier = Classifier::new(self.runtime.clone())
            .map_err(PackagingError::configuration)?
            .with_extra(spec.dist.bootstrap_includes.iter().cloned());
        let mode = LoaderMode::from_flag(spec.dist.compile_bootstrap_exes);
        let archive_name = self.runtime.archive_name();

        self.layout.prepare()?;

        self.reporter.section("Freezing");
        let request = FreezeRequest::new(
            spec.executables
                .iter()
                .map(|exe| FreezeExecutable::from_spec(exe, &self.platform))
                .collect(),
            options,
            self.layout.version_dir(),
            &archive_name,
        )
        .with_search_path_overrides(spec.search_path_overrides.clone());
        let output = self.freezer.freeze(&request).map_err(PackagingError::Freeze)?;
        tracing::info!(entries = output.listing.len(), "freeze complete");

        self.copy_data_files()?;
        self.append_package_data(&archive_name)?;

        let runtime_identity = self.runtime.identity(&self.platform);
        self.layout.write_runtime_identity(&runtime_identity)?;

        self.reporter.section("Bootstrapping");
        let source = BootstrapSource::new(&spec.dist.name, &logic)
            .custom_hook(hook.as_deref())
            .chainload(spec.dist.enable_chainload)
            .invoke_entry(mode.invokes_entry())
            .render();

        let mut manifest = BootstrapManifest::new(self.layout.bootstrap_dir());
        let injector =
            LoaderInjector::new(&self.layout, self.platform, self.compiler, self.transplanter);
        let entry_points = injector.inject(mode, &source, &spec.executables, &mut manifest)?;
        for (_, entry) in &entry_points {
            let size = std::fs::metadata(entry.binary()).ok().map(|m| m.len());
            self.reporter.produced(entry.binary(), "loader", size);
        }

        let bootstrap_archive = match mode {
            LoaderMode::DirectCompile => None,
            LoaderMode::StubPlusArchive => Some(self.assemble(
                &source,
                &classifier,
                &output,
                &archive_name,
                &entry_points,
                &mut manifest,
            )?),
        };

        manifest.write_to(&self.layout.manifest_path())?;
        self.layout.mark_complete()?;

        self.reporter.summary(
            entry_points.len(),
            "loaders built",
            started.elapsed().as_secs_f64(),
        );
        Ok(PackagingReport {
            version_dir: self.layout.version_dir().to_path_buf(),
            bootstrap_dir: self.layout.bootstrap_dir().to_path_buf(),
            mode,
            listing: output.listing,
            entry_points,
            bootstrap_archive,
            manifest,
            runtime_identity,
        })
    }

    fn assemble(
        &self,
        source: &str,
        classifier: &Classifier,
        output: &FreezeOutput,
        archive_name: &str,
        entry_points: &[(String, EntryPoint)],
        manifest: &mut BootstrapManifest,
    ) -> Result<AssembledArchive> {
        let compiled = compile_artifact(self.compiler, source, BOOTSTRAP_MODULE)?;

        let binaries: BTreeSet<String> = self
            .spec
            .executables
            .iter()
            .map(|exe| binary_name(exe, &self.platform))
            .collect();
        let mut support = classifier.select(output.names());
        support.retain(|name| name != archive_name && !binaries.contains(name));

        let assembler = Assembler::new(&self.layout, archive_name);
        let archive_names = full_archive_names(&assembler.full_archive_path())?;
        let classified = classifier.select(archive_names.iter().map(String::as_str));

        let assembled = assembler.assemble(
            &AssemblyInputs {
                compiled_bootstrap: &compiled,
                main_artifacts: entry_points
                    .iter()
                    .filter_map(|(_, entry)| entry.main_artifact())
                    .collect(),
                support_files: &support,
                classified_files: &classified,
            },
            manifest,
        )?;
        for path in &assembled.support_files {
            self.reporter.produced(path, "support file", None);
        }
        let size = std::fs::metadata(&assembled.path).ok().map(|m| m.len());
        self.reporter.produced(&assembled.path, "bootstrap archive", size);
        Ok(assembled)
    }

    fn copy_data_files(&self) -> Result<()> {
        for data in &self.spec.data_files {
            let dest = self.layout.version_dir().join(&data.dest);
            tracing::debug!(src = %data.source.display(), dest = %dest.display(), "copying data file");
            copy_path(&data.source, &dest)?;
        }
        Ok(())
    }

    fn append_package_data(&self, archive_name: &str) -> Result<()> {
        if self.spec.package_data.is_empty() {
            return Ok(());
        }
        let path = self.layout.frozen_path(archive_name);
        let mut writer = if path.is_file() {
            ArchiveWriter::append(&path)?
        } else {
            ArchiveWriter::create(&path)?
        };
        for item in &self.spec.package_data {
            let bytes = std::fs::read(&item.source).map_err(PackagingError::io_at(&item.source))?;
            if !writer.write_as(&item.name, &bytes)? {
                self.reporter.warning(&format!(
                    "package data '{}' is already in the full archive, keeping the frozen copy",
                    item.name
                ));
            }
        }
        writer.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileError;
    use bootdist_schema::ExecutableSpec;
    use tempfile::tempdir;

    struct NoFreeze;

    impl Freezer for NoFreeze {
        fn freeze(&self, _: &FreezeRequest) -> anyhow::Result<FreezeOutput> {
            anyhow::bail!("freezer must not run")
        }
    }

    struct NoCompile;

    impl Compiler for NoCompile {
        fn compile(&self, _: &str, name: &str) -> std::result::Result<Vec<u8>, CompileError> {
            Err(CompileError::new(name, "unexpected"))
        }

        fn compile_executable(
            &self,
            _: &str,
            exe: &ExecutableSpec,
            _: &Path,
        ) -> std::result::Result<(), CompileError> {
            Err(CompileError::new(&exe.name, "unexpected"))
        }
    }

    fn spec(dir: &Path, script: &str) -> DistSpec {
        let text = format!(
            r#"
[dist]
name = "example"
version = "1.0"
bootstrap-logic = "logic.py"

[[executable]]
name = "example"
script = "{script}"
"#
        );
        let mut spec = DistSpec::from_toml_str(&text).unwrap();
        spec.resolve_paths(dir);
        spec
    }

    #[test]
    fn bad_inputs_fail_before_any_output() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("logic.py"), "def bootstrap(): pass").unwrap();
        let spec = spec(tmp.path(), "missing.py");
        let out = tmp.path().join("dist");

        let err = Packager::new(&spec, &out, &NoFreeze, &NoCompile)
            .run()
            .unwrap_err();
        assert!(matches!(err, PackagingError::Configuration(_)));
        assert!(!out.exists());
    }

    #[test]
    fn unreadable_logic_is_configuration_error() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("example.py"), "").unwrap();
        let spec = spec(tmp.path(), "example.py");
        let out = tmp.path().join("dist");

        let err = Packager::new(&spec, &out, &NoFreeze, &NoCompile)
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("logic.py"));
        assert!(!out.exists());
    }

    #[test]
    fn freezer_failure_is_fatal_and_incomplete() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("logic.py"), "").unwrap();
        std::fs::write(tmp.path().join("example.py"), "").unwrap();
        let spec = spec(tmp.path(), "example.py");
        let out = tmp.path().join("dist");

        let packager = Packager::new(&spec, &out, &NoFreeze, &NoCompile)
            .platform("linux-x86_64".parse().unwrap());
        let err = packager.run().unwrap_err();
        assert!(matches!(err, PackagingError::Freeze(_)));
        assert!(err.to_string().contains("freezer must not run"));
        assert!(!packager.layout().is_complete());
    }
}
