//! Composite document identifiers (`<prefix>.<rest>`) and the flat paths
//! derived from them.

/// A catalog primary key such as `mdp.39015012345678` or `uc1.ark:/13960/t0abc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    raw: String,
}

impl DocumentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segment before the first dot: the content store the document lives in.
    pub fn prefix(&self) -> &str {
        self.raw.split_once('.').map_or(self.raw.as_str(), |(prefix, _)| prefix)
    }

    /// Everything after the first dot: the object key inside the store.
    pub fn rest(&self) -> &str {
        self.raw.split_once('.').map_or("", |(_, rest)| rest)
    }

    /// Store prefix with `/` flattened to `.`.
    pub fn pairtree_name(&self) -> String {
        self.prefix().replace('/', ".")
    }

    /// Object key with `/` flattened to `.`.
    pub fn pairtree_path(&self) -> String {
        self.rest().replace('/', ".")
    }

    /// `<pairtree_name>/<pairtree_path>`, used both in the content URL and as
    /// the package entry name.
    pub fn storage_path(&self) -> String {
        format!("{}/{}", self.pairtree_name(), self.pairtree_path())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
