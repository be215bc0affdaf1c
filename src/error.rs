//! Rich diagnostic error types for catalog-ld.
//!
//! Errors are split by blast radius: a [`RecordError`] drops one catalog row and
//! the run continues, while a [`CatalogError`] aborts the run. Content bundling
//! has its own [`ContentError`](crate::content::ContentError) so an archive
//! failure never costs a record its metadata.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::content::ContentError;

/// Run-fatal errors: the batch cannot continue.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("cannot open catalog input {path}")]
    #[diagnostic(
        code(catalog::input::open),
        help("Check that the catalog file exists and is readable.")
    )]
    InputOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog input unreadable near line {line}: {message}")]
    #[diagnostic(
        code(catalog::input::read),
        help(
            "The catalog stream could not be decoded. Verify that the file is a complete \
             gzip archive of tab-separated rows."
        )
    )]
    InputRead { line: u64, message: String },

    #[error("column layout drift at line {line}: expected {expected} columns, found {actual}")]
    #[diagnostic(
        code(catalog::input::schema_drift),
        help(
            "The catalog no longer matches the configured column layout. Update the \
             [columns] table in the configuration, or set `strict = false` to fail \
             short rows individually."
        )
    )]
    SchemaDrift {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("cannot write graph to {path}: {message}")]
    #[diagnostic(
        code(catalog::sink::write),
        help("Check that the output directory exists and is writable.")
    )]
    Sink { path: String, message: String },

    #[error("unsupported RDF serialization for {path}")]
    #[diagnostic(
        code(catalog::sink::format),
        help("Use a known RDF extension such as .ttl, .nt, .nq, .trig, .rdf or .n3.")
    )]
    UnknownFormat { path: String },

    #[error("archive root is not a directory: {path}")]
    #[diagnostic(
        code(catalog::content::archive_root),
        help(
            "The archive root must be an existing directory holding one \
             <prefix>/pairtree_root store per identifier prefix."
        )
    )]
    ArchiveRoot { path: String },

    #[error("content package error: {message}")]
    #[diagnostic(
        code(catalog::package::write),
        help("The output package could not be created or finalized. Check the output path.")
    )]
    Package { message: String },

    #[error("namespace is not a valid IRI: {iri}")]
    #[diagnostic(
        code(catalog::config::namespace),
        help("The namespace must be an absolute IRI ending in '/' or '#'.")
    )]
    Namespace { iri: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Content(#[from] ContentError),

    /// A record-level failure outside any record, e.g. while flushing entities.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Record(#[from] RecordError),
}

/// Convenience alias for run-level results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// ---------------------------------------------------------------------------
// Record errors
// ---------------------------------------------------------------------------

/// Record-fatal errors: the row is dropped, ingestion continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RecordError {
    #[error("missing column {index} ({field}); row has {len} columns")]
    #[diagnostic(
        code(catalog::record::missing_column),
        help("The row is shorter than the configured column layout.")
    )]
    MissingColumn {
        field: &'static str,
        index: usize,
        len: usize,
    },

    #[error("field {field} is not an integer: \"{value}\"")]
    #[diagnostic(
        code(catalog::record::parse_int),
        help("Numeric fields such as the publication year must contain digits only.")
    )]
    ParseInt {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("malformed {field}: {message}")]
    #[diagnostic(code(catalog::record::malformed))]
    Malformed { field: &'static str, message: String },

    #[error("identifier does not form a valid IRI: {iri}")]
    #[diagnostic(
        code(catalog::record::invalid_iri),
        help("Identifiers are appended to the namespace and must not contain spaces or quotes.")
    )]
    InvalidIri { iri: String, message: String },
}

/// Convenience alias for record-level results.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
