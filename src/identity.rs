//! Content-derived identity for repeated entities.
//!
//! An entity's identifier is the MD5 digest of its key's canonical string, so
//! equal keys get equal ids in every run without a shared counter. Each entity
//! kind has its own typed registry and id type; an author id cannot be used
//! where a publisher id is expected.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use md5::{Digest, Md5};

use crate::record::{AuthorKey, PublisherKey};

/// A key that can be digested into a stable identifier.
pub trait EntityKey: Clone + Ord {
    /// Canonical string form; equal keys must render identically.
    fn canonical(&self) -> String;
}

impl EntityKey for AuthorKey {
    fn canonical(&self) -> String {
        format!(
            "({}, {}, {}, {})",
            quoted(&self.given),
            quoted(&self.family),
            year(self.birth),
            year(self.death)
        )
    }
}

impl EntityKey for PublisherKey {
    fn canonical(&self) -> String {
        format!("({}, {})", quoted(&self.name), quoted(&self.place))
    }
}

/// `s` as a quoted tuple element: single quotes unless the text holds a
/// `'` and no `"`.
fn quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (0x7f..=0xa0).contains(&(c as u32)) => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Absent years render as an empty string literal.
fn year(y: Option<i32>) -> String {
    y.map_or_else(|| "''".to_string(), |y| y.to_string())
}

/// Fixed-length (32 hex chars) identifier for an entity of kind `K`.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId<K> {
    digest: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for StableId<K> {
    fn clone(&self) -> Self {
        Self {
            digest: self.digest.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: EntityKey> StableId<K> {
    /// Digest `key` without registering it.
    pub fn derive(key: &K) -> Self {
        Self {
            digest: hex::encode(Md5::digest(key.canonical().as_bytes())),
            _kind: PhantomData,
        }
    }
}

impl<K> StableId<K> {
    pub fn as_str(&self) -> &str {
        &self.digest
    }
}

impl<K> std::fmt::Display for StableId<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.digest)
    }
}

/// Append-only map from entity key to stable id.
#[derive(Debug)]
pub struct IdentityRegistry<K> {
    entries: BTreeMap<K, StableId<K>>,
}

pub type AuthorRegistry = IdentityRegistry<AuthorKey>;
pub type PublisherRegistry = IdentityRegistry<PublisherKey>;

impl<K: EntityKey> IdentityRegistry<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register `key` on first sight and return its id.
    pub fn resolve(&mut self, key: &K) -> StableId<K> {
        if let Some(id) = self.entries.get(key) {
            return id.clone();
        }
        let id = StableId::derive(key);
        self.entries.insert(key.clone(), id.clone());
        id
    }

    /// The id `key` has or would get, without registering it.
    pub fn peek(&self, key: &K) -> StableId<K> {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| StableId::derive(key))
    }

    pub fn get(&self, key: &K) -> Option<&StableId<K>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &StableId<K>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: EntityKey> Default for IdentityRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
