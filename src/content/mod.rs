//! Full-text content bundling.
//!
//! A document identifier `<prefix>.<rest>` names object `rest` in the store
//! for `prefix`. The object's first part holds a zip of page files; the pages
//! are read in archive order and joined into one text, which is then staged
//! into the output package next to a small JSON sidecar.
//!
//! Content failures never touch the graph: a record whose text cannot be
//! bundled keeps its metadata.

pub mod package;
pub mod pairtree;

use std::collections::HashMap;
use std::io::{Cursor, Read};

use miette::Diagnostic;
use thiserror::Error;

use crate::record::DocumentId;

pub use package::{ArchiveSink, EntryMetadata, MemoryArchive, ZipPackage};
pub use pairtree::{PairtreeFactory, PairtreeStore};

/// Errors that cost one record its bundled text.
#[derive(Debug, Error, Diagnostic)]
pub enum ContentError {
    #[error("object not found in store: {object}")]
    #[diagnostic(
        code(catalog::content::not_found),
        help("The catalog lists a document the archive does not hold.")
    )]
    NotFound { object: String },

    #[error("store for prefix \"{prefix}\" is unavailable at {path}")]
    #[diagnostic(
        code(catalog::content::store_unavailable),
        help("Check the archive root; each prefix needs a <root>/<prefix>/pairtree_root directory.")
    )]
    StoreUnavailable { prefix: String, path: String },

    #[error("malformed content for {object}: {message}")]
    #[diagnostic(code(catalog::content::malformed))]
    Malformed { object: String, message: String },

    #[error("content I/O error: {source}")]
    #[diagnostic(code(catalog::content::io))]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;

// ── Store traits ────────────────────────────────────────────────────────

/// Opens the object store that serves one identifier prefix.
pub trait StoreFactory {
    type Store: ObjectStore;

    fn open_store(&self, prefix: &str) -> ContentResult<Self::Store>;
}

/// Read-only access to objects addressed by identifier.
pub trait ObjectStore {
    /// Sorted part names of `object`, or the members of `part` when given.
    fn list_parts(&self, object: &str, part: Option<&str>) -> ContentResult<Vec<String>>;

    /// Bytes of the file at `path` (relative to the object) inside `object`.
    fn read_bytestream(&self, object: &str, path: &str) -> ContentResult<Vec<u8>>;
}

// ── Resolver ────────────────────────────────────────────────────────────

/// Resolves document identifiers to their concatenated page text.
///
/// Store handles are opened lazily and cached per prefix for the life of the
/// resolver.
pub struct ContentResolver<F: StoreFactory> {
    factory: F,
    stores: HashMap<String, F::Store>,
}

impl<F: StoreFactory> ContentResolver<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            stores: HashMap::new(),
        }
    }

    /// Number of store handles opened so far.
    pub fn open_stores(&self) -> usize {
        self.stores.len()
    }

    /// Fetch and join the pages of `id`.
    pub fn resolve(&mut self, id: &DocumentId) -> ContentResult<String> {
        let prefix = id.prefix();
        let object = id.rest();

        if !self.stores.contains_key(prefix) {
            let store = self.factory.open_store(prefix)?;
            tracing::debug!(prefix, "object store opened");
            self.stores.insert(prefix.to_string(), store);
        }
        let store = &self.stores[prefix];

        let part = store
            .list_parts(object, None)?
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::Malformed {
                object: id.to_string(),
                message: "object has no parts".into(),
            })?;
        let bundle = store
            .list_parts(object, Some(&part))?
            .into_iter()
            .find(|member| member.ends_with("zip"))
            .ok_or_else(|| ContentError::Malformed {
                object: id.to_string(),
                message: format!("no zip member in part {part}"),
            })?;

        let bytes = store.read_bytestream(object, &format!("{part}/{bundle}"))?;
        read_pages(id, bytes)
    }
}

/// Read every entry of a zip as UTF-8, in archive order, joined by `\n`.
/// Directory entries count as empty pages.
fn read_pages(id: &DocumentId, bytes: Vec<u8>) -> ContentResult<String> {
    let malformed = |message: String| ContentError::Malformed {
        object: id.to_string(),
        message,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| malformed(e.to_string()))?;
    let mut pages = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| malformed(e.to_string()))?;
        let mut page = String::new();
        entry
            .read_to_string(&mut page)
            .map_err(|e| malformed(format!("{}: {e}", entry.name())))?;
        pages.push(page);
    }
    Ok(pages.join("\n"))
}
