//! Output package for bundled document text.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{ContentError, ContentResult};
use crate::error::{CatalogError, CatalogResult};

/// Sidecar written next to every bundled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub content_type: String,
}

impl EntryMetadata {
    pub fn plain_text() -> Self {
        Self {
            content_type: "text/plain".into(),
        }
    }
}

/// Destination for bundled documents.
pub trait ArchiveSink {
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> ContentResult<()>;

    /// Flush and close the package. Later writes are errors.
    fn finish(&mut self) -> CatalogResult<()>;

    /// Write a `<path>.metadata` sidecar, then `text` under `path`.
    ///
    /// The sidecar goes first: if either write fails the package never holds
    /// document text without its metadata.
    fn stage_document(&mut self, path: &str, text: &str) -> ContentResult<()> {
        let sidecar =
            serde_json::to_vec(&EntryMetadata::plain_text()).map_err(|e| ContentError::Malformed {
                object: path.to_string(),
                message: e.to_string(),
            })?;
        self.write_entry(&format!("{path}.metadata"), &sidecar)?;
        self.write_entry(path, text.as_bytes())
    }
}

/// A zip file on disk.
pub struct ZipPackage {
    path: PathBuf,
    writer: Option<ZipWriter<BufWriter<File>>>,
    entries: usize,
}

impl ZipPackage {
    pub fn create(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| CatalogError::Package {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(Self {
            path,
            writer: Some(ZipWriter::new(BufWriter::new(file))),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written so far, sidecars included.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

impl ArchiveSink for ZipPackage {
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> ContentResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| ContentError::Malformed {
            object: path.to_string(),
            message: "package already finished".into(),
        })?;
        writer
            .start_file(path, SimpleFileOptions::default())
            .map_err(|e| ContentError::Io {
                source: e.into(),
            })?;
        writer.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    fn finish(&mut self) -> CatalogResult<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let package_error = |message: String| CatalogError::Package {
            message: format!("{}: {message}", self.path.display()),
        };
        writer
            .finish()
            .map_err(|e| package_error(e.to_string()))?
            .flush()
            .map_err(|e| package_error(e.to_string()))?;
        tracing::info!(path = %self.path.display(), entries = self.entries, "package written");
        Ok(())
    }
}

/// Keeps entries in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    pub entries: Vec<(String, Vec<u8>)>,
    pub finished: bool,
}

impl MemoryArchive {
    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(name, _)| name == path)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl ArchiveSink for MemoryArchive {
    fn write_entry(&mut self, path: &str, bytes: &[u8]) -> ContentResult<()> {
        self.entries.push((path.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> CatalogResult<()> {
        self.finished = true;
        Ok(())
    }
}
