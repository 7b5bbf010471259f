//! ZIP packaging of processed images

use crate::{
    config::DEFAULT_ARCHIVE_NAME,
    error::{BgRemovalError, Result},
    types::ArchiveArtifact,
};
use std::io::{Cursor, Seek, Write};
use std::path::PathBuf;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// Where a finished archive is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveDestination {
    /// Write to this file, replacing any previous archive there
    File(PathBuf),
    /// Keep the archive bytes in memory
    Memory,
}

impl Default for ArchiveDestination {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_ARCHIVE_NAME))
    }
}

/// Collects named entries and writes them as one deflate-compressed archive
///
/// Adding an entry under a name that is already present replaces the
/// earlier bytes, so every name appears exactly once.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: Into<String>>(&mut self, name: S, bytes: Vec<u8>) {
        let name = name.into();
        if let Some(existing) = self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            log::debug!("Archive entry '{name}' added twice, keeping the latest");
            existing.1 = bytes;
        } else {
            self.entries.push((name, bytes));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the archive to `destination`
    ///
    /// # Errors
    /// - The destination file cannot be created
    /// - ZIP encoding failures
    pub fn finish(self, destination: &ArchiveDestination) -> Result<ArchiveArtifact> {
        let entries = self.entries.len();
        match destination {
            ArchiveDestination::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        BgRemovalError::file_io_error("create archive directory", parent, &e)
                    })?;
                }
                let file = std::fs::File::create(path)
                    .map_err(|e| BgRemovalError::file_io_error("create archive", path, &e))?;
                self.write_entries(file)?;
                log::info!("Wrote {entries} entries to {}", path.display());
                Ok(ArchiveArtifact::File {
                    path: path.clone(),
                    entries,
                })
            },
            ArchiveDestination::Memory => {
                let bytes = self.write_entries(Cursor::new(Vec::new()))?.into_inner();
                log::debug!("Built in-memory archive of {} bytes", bytes.len());
                Ok(ArchiveArtifact::Memory { bytes, entries })
            },
        }
    }

    fn write_entries<W: Write + Seek>(self, writer: W) -> Result<W> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(writer);
        for (name, bytes) in self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&bytes)?;
        }
        Ok(zip.finish()?)
    }
}

/// List the entry names of an archive in stored order
pub fn read_entry_names(archive_bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        names.push(archive.by_index(index)?.name().to_string());
    }
    Ok(names)
}

/// Read one entry's bytes from an archive
pub fn read_entry(archive_bytes: &[u8], name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut file = archive.by_name(name)?;
    let mut bytes = Vec::new();
    std::io::copy(&mut file, &mut bytes)?;
    Ok(bytes)
}
