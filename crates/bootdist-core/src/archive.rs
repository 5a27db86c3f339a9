//! Zip containers for the full and bootstrap archives.
//!
//! Entries are stored uncompressed with a fixed modification time and fixed
//! permissions, so the same entries written in the same order produce the
//! same bytes. A name is written at most once per archive; later writes of an
//! existing name are dropped.

use bootdist_schema::{Artifact, Blake3Hash};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{PackagingError, Result};

/// Modification time stamped on every entry: 2000-01-01 00:00:00.
pub const FIXED_TIMESTAMP: (u16, u8, u8, u8, u8, u8) = (2000, 1, 1, 0, 0, 0);

const ENTRY_MODE: u32 = 0o644;

fn fixed_datetime() -> Result<DateTime> {
    let (y, mo, d, h, mi, s) = FIXED_TIMESTAMP;
    DateTime::from_date_and_time(y, mo, d, h, mi, s).map_err(|e| {
        PackagingError::Io(std::io::Error::other(format!(
            "invalid archive timestamp: {e:?}"
        )))
    })
}

/// Options applied to every entry written by [`ArchiveWriter`].
///
/// # Errors
///
/// Fails only if [`FIXED_TIMESTAMP`] is outside the zip date range.
pub fn entry_options() -> Result<SimpleFileOptions> {
    Ok(SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(fixed_datetime()?)
        .unix_permissions(ENTRY_MODE))
}

/// Exclusive, write-once handle on an archive being built.
///
/// Opened once and consumed by [`ArchiveWriter::finish`].
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    names: BTreeSet<String>,
    options: SimpleFileOptions,
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("path", &self.path)
            .field("entries", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl ArchiveWriter {
    /// Create a new, empty archive at `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PackagingError::io_at(parent))?;
        }
        let file = File::create(path).map_err(PackagingError::io_at(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
            names: BTreeSet::new(),
            options: entry_options()?,
        })
    }

    /// Open an existing archive for appending. Names already present count
    /// as written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a zip archive.
    pub fn append(path: &Path) -> Result<Self> {
        let names = ArchiveReader::open(path)?.names().into_iter().collect();
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(PackagingError::io_at(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new_append(file)?,
            names,
            options: entry_options()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names written so far, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Write `artifact` under its logical name.
    ///
    /// Returns `false` without writing if the name is already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn write(&mut self, artifact: &Artifact) -> Result<bool> {
        self.write_as(artifact.logical_name(), artifact.payload())
    }

    /// Write raw bytes under `name`, with the same first-writer-wins rule as
    /// [`ArchiveWriter::write`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn write_as(&mut self, name: &str, payload: &[u8]) -> Result<bool> {
        if self.names.contains(name) {
            tracing::debug!(name, "archive entry already present, skipping");
            return Ok(false);
        }
        self.zip.start_file(name, self.options)?;
        std::io::Write::write_all(&mut self.zip, payload)?;
        self.names.insert(name.to_string());
        Ok(true)
    }

    /// Copy every file entry of `source` accepted by `filter`, skipping
    /// directories and names already written. Entries are visited in the
    /// source's stored order.
    ///
    /// Returns the names actually copied.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be read or written.
    pub fn merge_from<F>(&mut self, source: &mut ArchiveReader, mut filter: F) -> Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut copied = Vec::new();
        for index in 0..source.archive.len() {
            let (name, payload) = {
                let mut entry = source.archive.by_index(index)?;
                if entry.is_dir() || !filter(entry.name()) || self.names.contains(entry.name()) {
                    continue;
                }
                let mut payload = Vec::new();
                entry.read_to_end(&mut payload)?;
                (entry.name().to_string(), payload)
            };
            if self.write_as(&name, &payload)? {
                copied.push(name);
            }
        }
        Ok(copied)
    }

    /// Persist the central directory and close the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be finalized.
    pub fn finish(self) -> Result<PathBuf> {
        self.zip.finish()?;
        tracing::debug!(path = %self.path.display(), entries = self.names.len(), "archive written");
        Ok(self.path)
    }
}

/// Metadata for one stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    /// `YYYY-MM-DD HH:MM:SS`, if the entry carries a timestamp.
    pub modified: Option<String>,
    pub digest: Blake3Hash,
}

/// Read-only view of a finished archive.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ArchiveReader {
    /// Open the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a zip archive.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(PackagingError::io_at(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive: ZipArchive::new(file)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Entry names in stored order.
    pub fn names(&self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.name_for_index(i).map(str::to_string))
            .collect()
    }

    /// Read one entry as an [`Artifact`].
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Archive`] if `name` is not present.
    pub fn read(&mut self, name: &str) -> Result<Artifact> {
        let mut entry = self.archive.by_name(name)?;
        let mut payload = Vec::new();
        entry.read_to_end(&mut payload)?;
        Ok(Artifact::new(name, payload))
    }

    /// Metadata for every file entry, in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry cannot be read.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut out = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let mut entry = self.archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let modified = entry.last_modified().map(|t| {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    t.year(),
                    t.month(),
                    t.day(),
                    t.hour(),
                    t.minute(),
                    t.second()
                )
            });
            let mut payload = Vec::new();
            entry.read_to_end(&mut payload)?;
            out.push(ArchiveEntry {
                name: entry.name().to_string(),
                size: entry.size(),
                modified,
                digest: Blake3Hash::compute(&payload),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_writer_wins() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.zip");
        let mut writer = ArchiveWriter::create(&path).unwrap();
        assert!(writer.write(&Artifact::new("mod", b"first".to_vec())).unwrap());
        assert!(!writer.write(&Artifact::new("mod", b"second".to_vec())).unwrap());
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.names(), vec!["mod"]);
        assert_eq!(reader.read("mod").unwrap().payload(), b"first");
    }

    #[test]
    fn entries_are_stamped_and_stored() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.zip");
        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.write_as("x", b"payload").unwrap();
        writer.finish().unwrap();

        let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let entry = zip.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);

        let mut reader = ArchiveReader::open(&path).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries[0].modified.as_deref(), Some("2000-01-01 00:00:00"));
        assert_eq!(entries[0].size, 7);
        assert_eq!(entries[0].digest, Blake3Hash::compute(b"payload"));
    }

    #[test]
    fn same_writes_give_same_bytes() {
        let tmp = tempdir().unwrap();
        let build = |name: &str| {
            let path = tmp.path().join(name);
            let mut writer = ArchiveWriter::create(&path).unwrap();
            writer.write_as("b", b"two").unwrap();
            writer.write_as("a", b"one").unwrap();
            writer.finish().unwrap();
            std::fs::read(path).unwrap()
        };
        assert_eq!(build("one.zip"), build("two.zip"));
    }

    #[test]
    fn merge_respects_filter_and_existing_names() {
        let tmp = tempdir().unwrap();
        let full = tmp.path().join("full.zip");
        let mut writer = ArchiveWriter::create(&full).unwrap();
        writer.write_as("keep", b"k").unwrap();
        writer.write_as("drop", b"d").unwrap();
        writer.write_as("taken", b"from-full").unwrap();
        writer.finish().unwrap();

        let out = tmp.path().join("out.zip");
        let mut writer = ArchiveWriter::create(&out).unwrap();
        writer.write_as("taken", b"ours").unwrap();
        let mut source = ArchiveReader::open(&full).unwrap();
        let copied = writer
            .merge_from(&mut source, |name| name != "drop")
            .unwrap();
        assert_eq!(copied, vec!["keep"]);
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&out).unwrap();
        assert_eq!(reader.names(), vec!["taken", "keep"]);
        assert_eq!(reader.read("taken").unwrap().payload(), b"ours");
    }

    #[test]
    fn append_keeps_existing_entries() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("lib.zip");
        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.write_as("encodings/utf_8", b"codec").unwrap();
        writer.finish().unwrap();

        let mut writer = ArchiveWriter::append(&path).unwrap();
        assert!(writer.contains("encodings/utf_8"));
        assert!(!writer.write_as("encodings/utf_8", b"other").unwrap());
        assert!(writer.write_as("example/data.bin", b"data").unwrap());
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.read("encodings/utf_8").unwrap().payload(), b"codec");
        assert_eq!(reader.read("example/data.bin").unwrap().payload(), b"data");
    }

    #[test]
    fn missing_entry_is_an_archive_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.zip");
        ArchiveWriter::create(&path).unwrap().finish().unwrap();
        let mut reader = ArchiveReader::open(&path).unwrap();
        assert!(reader.is_empty());
        assert!(matches!(reader.read("nope"), Err(PackagingError::Archive(_))));
    }
}
