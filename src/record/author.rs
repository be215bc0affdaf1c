//! Packed author field parsing.
//!
//! Catalogs pack several people into one field, each optionally followed by a
//! `birth-death` year range: `"Smith, John 1820-1895Doe, Jane"`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RecordError, RecordResult};

/// A name run starting with a letter, then an optional `birth-[death]` suffix.
static AUTHOR_CHUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z]\D*)(?:(?P<birth>\d+)-(?P<death>\d+)?)?").expect("static regex")
});

/// Identity of a person before it has a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorKey {
    /// Empty when the catalog gives no given name.
    pub given: String,
    /// Empty only for anomalous entries.
    pub family: String,
    pub birth: Option<i32>,
    pub death: Option<i32>,
}

impl AuthorKey {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            birth: None,
            death: None,
        }
    }

    pub fn with_years(mut self, birth: Option<i32>, death: Option<i32>) -> Self {
        self.birth = birth;
        self.death = death;
        self
    }

    /// Both name parts are present: the author gets full person facts.
    pub fn is_full(&self) -> bool {
        !self.given.is_empty() && !self.family.is_empty()
    }
}

/// Split `author` into author keys, in order of appearance.
///
/// Chunks with neither a family nor a given name are logged and left out.
/// A year too large for `i32` fails the whole record.
pub fn parse_authors(author: &str) -> RecordResult<Vec<AuthorKey>> {
    let mut keys = Vec::new();

    for caps in AUTHOR_CHUNK.captures_iter(author) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let (family, given) = match name.split_once(',') {
            Some((family, given)) => (family, given),
            None => (name, ""),
        };
        let family = family.replace(',', "").trim().to_string();
        let given = given.replace(',', "").trim().to_string();

        if family.is_empty() && given.is_empty() {
            tracing::warn!(chunk = name, "author entry without a usable name, skipping");
            continue;
        }

        let birth = parse_year(caps.name("birth").map(|m| m.as_str()), "author birth year")?;
        let death = parse_year(caps.name("death").map(|m| m.as_str()), "author death year")?;

        keys.push(AuthorKey {
            given,
            family,
            birth,
            death,
        });
    }

    Ok(keys)
}

fn parse_year(raw: Option<&str>, field: &'static str) -> RecordResult<Option<i32>> {
    match raw {
        None | Some("") => Ok(None),
        Some(digits) => digits
            .parse::<i32>()
            .map(Some)
            .map_err(|e| RecordError::ParseInt {
                field,
                value: digits.to_string(),
                message: e.to_string(),
            }),
    }
}
