//! Filesystem pairtree object store.
//!
//! Layout: `<root>/<prefix>/pairtree_root/<shorties>/<part>/<files>`, where
//! the shorties are the encoded identifier cut into two-character segments
//! and each part is a directory whose name is longer than two characters.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{ContentError, ContentResult, ObjectStore, StoreFactory};
use crate::error::{CatalogError, CatalogResult};

/// Directory under a store that holds the shorty tree.
pub const PAIRTREE_ROOT: &str = "pairtree_root";

/// Opens `<root>/<prefix>` as a pairtree store.
#[derive(Debug, Clone)]
pub struct PairtreeFactory {
    root: PathBuf,
}

impl PairtreeFactory {
    /// Open the archive root. A root that is not a directory fails the run;
    /// a missing store under it only fails the records that need it.
    pub fn open(root: impl Into<PathBuf>) -> CatalogResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::ArchiveRoot {
                path: root.display().to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StoreFactory for PairtreeFactory {
    type Store = PairtreeStore;

    fn open_store(&self, prefix: &str) -> ContentResult<PairtreeStore> {
        let store_dir = self.root.join(prefix);
        let tree = store_dir.join(PAIRTREE_ROOT);
        if !tree.is_dir() {
            return Err(ContentError::StoreUnavailable {
                prefix: prefix.to_string(),
                path: store_dir.display().to_string(),
            });
        }
        Ok(PairtreeStore { tree })
    }
}

/// One opened pairtree (a single identifier prefix).
#[derive(Debug, Clone)]
pub struct PairtreeStore {
    tree: PathBuf,
}

impl PairtreeStore {
    /// Directory holding the parts of `object`, whether or not it exists.
    pub fn object_dir(&self, object: &str) -> PathBuf {
        let mut dir = self.tree.clone();
        dir.extend(shorties(&encode_id(object)));
        dir
    }

    fn existing_object_dir(&self, object: &str) -> ContentResult<PathBuf> {
        let dir = self.object_dir(object);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ContentError::NotFound {
                object: object.to_string(),
            })
        }
    }
}

impl ObjectStore for PairtreeStore {
    fn list_parts(&self, object: &str, part: Option<&str>) -> ContentResult<Vec<String>> {
        let dir = self.existing_object_dir(object)?;
        match part {
            None => {
                let mut names = entry_names(&dir)?;
                names.retain(|name| name.len() > 2);
                Ok(names)
            }
            Some(part) => entry_names(&dir.join(relative(object, part)?)),
        }
    }

    fn read_bytestream(&self, object: &str, path: &str) -> ContentResult<Vec<u8>> {
        let dir = self.existing_object_dir(object)?;
        fs::read(dir.join(relative(object, path)?)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ContentError::NotFound {
                object: format!("{object}/{path}"),
            },
            _ => ContentError::Io { source: e },
        })
    }
}

/// Sorted names of the entries in `dir`.
fn entry_names(dir: &Path) -> ContentResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Reject paths that would leave the object directory.
fn relative<'a>(object: &str, path: &'a str) -> ContentResult<&'a Path> {
    let path = Path::new(path);
    if path.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(path)
    } else {
        Err(ContentError::Malformed {
            object: object.to_string(),
            message: format!("path escapes the object: {}", path.display()),
        })
    }
}

/// Encode an identifier for use as a pairtree path.
///
/// Reserved and non-visible bytes become `^hh`; then `/`, `:` and `.` map to
/// `=`, `+` and `,`.
pub fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'"' | b'*' | b'+' | b',' | b'<' | b'=' | b'>' | b'?' | b'\\' | b'^' | b'|' => {
                out.push_str(&format!("^{byte:02x}"));
            }
            b'/' => out.push('='),
            b':' => out.push('+'),
            b'.' => out.push(','),
            0x21..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("^{byte:02x}")),
        }
    }
    out
}

/// Cut an encoded identifier into two-character directory names.
pub fn shorties(encoded: &str) -> Vec<String> {
    encoded
        .as_bytes()
        .chunks(2)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}
