//! Bootstrap archive assembly.
//!
//! The bootstrap archive is written in a fixed order: the compiled bootstrap
//! module, one main stub per loader, then the bootstrap-tier entries of the
//! full archive. Because writes are first-writer-wins, an entry of the full
//! archive can never shadow the bootstrap module or a main stub.

use bootdist_schema::{Artifact, Blake3Hash};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::{PackagingError, Result};
use crate::layout::DistLayout;
use crate::manifest::BootstrapManifest;

/// Entry name of the compiled bootstrap program.
pub const BOOTSTRAP_MODULE: &str = "bootstrap_module";

/// Inputs to one assembly.
#[derive(Debug, Clone)]
pub struct AssemblyInputs<'a> {
    /// Compiled bootstrap program, stored as [`BOOTSTRAP_MODULE`].
    pub compiled_bootstrap: &'a Artifact,
    /// One main stub per loader, already named `<stem>_main`.
    pub main_artifacts: Vec<&'a Artifact>,
    /// Native files from the version directory the loaders need beside them.
    pub support_files: &'a BTreeSet<String>,
    /// Full-archive entries that belong in the bootstrap tier.
    pub classified_files: &'a BTreeSet<String>,
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledArchive {
    pub path: PathBuf,
    /// Entry names in stored order.
    pub entries: Vec<String>,
    /// Native files copied beside the loaders.
    pub support_files: Vec<PathBuf>,
    pub digest: Blake3Hash,
}

/// Builds the bootstrap archive for a version directory.
#[derive(Debug)]
pub struct Assembler<'a> {
    layout: &'a DistLayout,
    archive_name: &'a str,
}

impl<'a> Assembler<'a> {
    /// `archive_name` names both the full archive in the version directory
    /// and the bootstrap archive in the bootstrap directory.
    pub fn new(layout: &'a DistLayout, archive_name: &'a str) -> Self {
        Self {
            layout,
            archive_name,
        }
    }

    pub fn full_archive_path(&self) -> PathBuf {
        self.layout.frozen_path(self.archive_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.layout.bootstrap_path(self.archive_name)
    }

    /// Write the bootstrap archive, copy support files, and register both in
    /// `manifest`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O or archive error; the output is then incomplete
    /// and the run must start over.
    pub fn assemble(
        &self,
        inputs: &AssemblyInputs<'_>,
        manifest: &mut BootstrapManifest,
    ) -> Result<AssembledArchive> {
        let out_path = self.output_path();
        let mut writer = ArchiveWriter::create(&out_path)?;

        writer.write_as(BOOTSTRAP_MODULE, inputs.compiled_bootstrap.payload())?;

        for main in &inputs.main_artifacts {
            if !writer.write(main)? {
                return Err(PackagingError::configuration(format!(
                    "two executables share the main stub name '{}'",
                    main.logical_name()
                )));
            }
        }

        let support_files = self.copy_support_files(inputs.support_files, manifest)?;

        let full_path = self.full_archive_path();
        if full_path.is_file() {
            let mut full = ArchiveReader::open(&full_path)?;
            let merged =
                writer.merge_from(&mut full, |name| inputs.classified_files.contains(name))?;
            tracing::debug!(count = merged.len(), "merged bootstrap-tier entries");
        } else {
            tracing::warn!(path = %full_path.display(), "no full archive to merge from");
        }

        let entries: Vec<String> = {
            let path = writer.finish()?;
            ArchiveReader::open(&path)?.names()
        };
        manifest.register(&out_path)?;

        let digest =
            Blake3Hash::compute_file(&out_path).map_err(PackagingError::io_at(&out_path))?;
        tracing::info!(path = %out_path.display(), entries = entries.len(), digest = digest.short(), "bootstrap archive assembled");
        Ok(AssembledArchive {
            path: out_path,
            entries,
            support_files,
            digest,
        })
    }

    fn copy_support_files(
        &self,
        names: &BTreeSet<String>,
        manifest: &mut BootstrapManifest,
    ) -> Result<Vec<PathBuf>> {
        let mut copied = Vec::with_capacity(names.len());
        for name in names {
            if name == self.archive_name {
                continue;
            }
            copied.push(self.layout.copy_to_bootstrap_env(name, manifest)?);
        }
        Ok(copied)
    }
}

/// Read the entry names of the full archive at `path`, or nothing if the
/// freezer did not produce one.
///
/// # Errors
///
/// Returns an error if the file exists but is not a readable archive.
pub fn full_archive_names(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    Ok(ArchiveReader::open(path)?.names())
}
