//! Catalog record normalization.
//!
//! A raw row is a fixed-position sequence of text fields. The normalizer turns
//! it into a [`NormalizedRecord`] (document fields, author keys, publisher key)
//! or tells the driver why the row was skipped.

pub mod author;
pub mod identifier;
pub mod publisher;

pub use author::{AuthorKey, parse_authors};
pub use identifier::DocumentId;
pub use publisher::{PublisherKey, normalize_publisher_name};

use crate::config::{ColumnLayout, PipelineConfig};
use crate::error::{RecordError, RecordResult};

/// One tab-separated catalog row with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRecord {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    fn field(&self, field: &'static str, index: usize) -> RecordResult<&str> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or(RecordError::MissingColumn {
                field,
                index,
                len: self.fields.len(),
            })
    }
}

/// Why a row produced nothing, without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The access column carries the deny sentinel.
    AccessDenied,
    /// Published after the configured cutoff year.
    AfterCutoff { year: i32 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessDenied => f.write_str("access denied"),
            Self::AfterCutoff { year } => write!(f, "published {year}, after cutoff"),
        }
    }
}

/// Typed fields of a row that passed filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub id: DocumentId,
    pub enumeration: Option<String>,
    pub title: String,
    /// `<year>-01-01`, when a year is present.
    pub publication_date: Option<String>,
    pub publication_place: String,
    pub language: String,
    pub document_type: String,
    pub authors: Vec<AuthorKey>,
    /// Present only when the normalized publisher name is non-empty.
    pub publisher: Option<PublisherKey>,
}

/// Outcome of normalizing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    Skipped(SkipReason),
    Document(NormalizedRecord),
}

/// Parses raw rows according to a column layout and filtering policy.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    columns: ColumnLayout,
    deny_sentinel: String,
    year_cutoff: Option<i32>,
}

impl RecordNormalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            columns: config.columns.clone(),
            deny_sentinel: config.deny_sentinel.clone(),
            year_cutoff: config.apply_year_cutoff.then_some(config.year_cutoff),
        }
    }

    pub fn columns(&self) -> &ColumnLayout {
        &self.columns
    }

    /// Normalize one row.
    ///
    /// A denied row is skipped before any other field is looked at. The year
    /// is checked before authors are parsed, so a late row never reaches
    /// author parsing.
    pub fn normalize(&self, raw: &RawRecord) -> RecordResult<Normalization> {
        let cols = &self.columns;

        if raw.field("access", cols.access)? == self.deny_sentinel {
            return Ok(Normalization::Skipped(SkipReason::AccessDenied));
        }

        let year = raw.field("publication_year", cols.publication_year)?.trim();
        if let Some(cutoff) = self.year_cutoff {
            let parsed: i32 = year.parse().map_err(|e: std::num::ParseIntError| {
                RecordError::ParseInt {
                    field: "publication_year",
                    value: year.to_string(),
                    message: e.to_string(),
                }
            })?;
            if parsed > cutoff {
                return Ok(Normalization::Skipped(SkipReason::AfterCutoff { year: parsed }));
            }
        }
        let publication_date = (!year.is_empty()).then(|| format!("{year}-01-01"));

        let id = raw.field("identifier", cols.identifier)?.trim();
        if id.is_empty() {
            return Err(RecordError::Malformed {
                field: "identifier",
                message: "empty primary key".into(),
            });
        }

        let enumeration = raw.field("enumeration", cols.enumeration)?.trim();
        let publication_place = raw
            .field("publication_place", cols.publication_place)?
            .trim()
            .to_string();
        let publisher_name = normalize_publisher_name(raw.field("imprint", cols.imprint)?);

        Ok(Normalization::Document(NormalizedRecord {
            id: DocumentId::new(id),
            enumeration: (!enumeration.is_empty()).then(|| enumeration.to_string()),
            title: raw.field("title", cols.title)?.trim().to_string(),
            publication_date,
            language: raw.field("language", cols.language)?.trim().to_string(),
            document_type: raw.field("document_type", cols.document_type)?.trim().to_string(),
            authors: parse_authors(raw.field("author", cols.author)?.trim())?,
            publisher: (!publisher_name.is_empty())
                .then(|| PublisherKey::new(publisher_name, publication_place.clone())),
            publication_place,
        }))
    }
}
