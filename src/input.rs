//! Catalog input: a headerless tab-separated file, optionally gzip-compressed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{CatalogError, CatalogResult};
use crate::record::RawRecord;

/// Streams [`RawRecord`]s from a catalog file.
///
/// Quote characters are ordinary text in the catalog, so quoting is off and
/// rows may have any number of columns. Fields that are not valid UTF-8 are
/// decoded lossily.
pub struct CatalogReader {
    rows: csv::Reader<Box<dyn Read>>,
    buffer: csv::ByteRecord,
    line: u64,
    failed: bool,
}

impl CatalogReader {
    /// Open `path`, decompressing when the extension is `.gz`.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let file = File::open(path).map_err(|e| CatalogError::InputOpen {
            path: path.display().to_string(),
            source: e,
        })?;
        let gzipped = path.extension().is_some_and(|ext| ext == "gz");
        let source: Box<dyn Read> = if gzipped {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        tracing::debug!(path = %path.display(), gzipped, "catalog opened");
        Ok(Self::from_reader(source))
    }

    pub fn from_reader(source: Box<dyn Read>) -> Self {
        let rows = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(source);
        Self {
            rows,
            buffer: csv::ByteRecord::new(),
            line: 0,
            failed: false,
        }
    }
}

impl Iterator for CatalogReader {
    type Item = CatalogResult<RawRecord>;

    /// A read error ends the stream.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.rows.read_byte_record(&mut self.buffer) {
            Ok(false) => None,
            Ok(true) => {
                self.line = self
                    .buffer
                    .position()
                    .map_or(self.line + 1, |pos| pos.line());
                let fields = self
                    .buffer
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect();
                Some(Ok(RawRecord::new(self.line, fields)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(CatalogError::InputRead {
                    line: self.line + 1,
                    message: e.to_string(),
                }))
            }
        }
    }
}
