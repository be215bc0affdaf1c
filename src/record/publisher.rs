//! Publisher name normalization from free-text imprint fields.

use std::sync::LazyLock;

use regex::Regex;

static FOUR_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("static regex"));
static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z ]").expect("static regex"));

/// Identity of a publisher: normalized name plus place of publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublisherKey {
    pub name: String,
    pub place: String,
}

impl PublisherKey {
    pub fn new(name: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            place: place.into(),
        }
    }
}

/// Strip embedded years, then everything but ASCII letters and spaces, then trim.
pub fn normalize_publisher_name(imprint: &str) -> String {
    let without_years = FOUR_DIGITS.replace_all(imprint, "");
    NON_LETTER
        .replace_all(&without_years, "")
        .trim()
        .to_string()
}
