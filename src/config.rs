//! Pipeline configuration, persisted as TOML.
//!
//! Column positions are a contract with the upstream catalog provider, so they
//! live here rather than in the normalizer. Every field has a default matching
//! the HathiTrust hathifile layout.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or saving configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(catalog::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(catalog::config::parse),
        help("Check the TOML syntax and field names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(catalog::config::invalid),
        help("Adjust the [columns] table so every configured column fits in `expected`.")
    )]
    Invalid { message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(catalog::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Namespace for documents, entities and shapes.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Data-graph size that triggers the single checkpoint.
    #[serde(default = "default_checkpoint_threshold")]
    pub checkpoint_threshold: usize,
    /// Records published after this year are skipped.
    #[serde(default = "default_year_cutoff")]
    pub year_cutoff: i32,
    /// When false, the year filter is off and an empty year field is accepted.
    #[serde(default = "default_true")]
    pub apply_year_cutoff: bool,
    /// Access-field value that excludes a record outright.
    #[serde(default = "default_deny_sentinel")]
    pub deny_sentinel: String,
    #[serde(default)]
    pub columns: ColumnLayout,
}

fn default_namespace() -> String {
    "http://cdh.jhu.edu/materials/".into()
}
fn default_checkpoint_threshold() -> usize {
    5000
}
fn default_year_cutoff() -> i32 {
    1800
}
fn default_true() -> bool {
    true
}
fn default_deny_sentinel() -> String {
    "deny".into()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            checkpoint_threshold: default_checkpoint_threshold(),
            year_cutoff: default_year_cutoff(),
            apply_year_cutoff: true,
            deny_sentinel: default_deny_sentinel(),
            columns: ColumnLayout::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Reject layouts no row could satisfy.
    pub fn validate(&self) -> ConfigResult<()> {
        let columns = &self.columns;
        if columns.strict && columns.expected < columns.min_len() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "strict layout expects {} columns but reads column {}",
                    columns.expected,
                    columns.min_len() - 1
                ),
            });
        }
        Ok(())
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Zero-based column positions in the tab-separated catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub identifier: usize,
    pub access: usize,
    pub enumeration: usize,
    pub title: usize,
    pub imprint: usize,
    pub publication_year: usize,
    pub publication_place: usize,
    pub language: usize,
    pub document_type: usize,
    pub author: usize,
    /// Number of columns every row is expected to carry.
    pub expected: usize,
    /// Abort the run when a row's column count differs from `expected`.
    pub strict: bool,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            identifier: 0,
            access: 1,
            enumeration: 4,
            title: 11,
            imprint: 12,
            publication_year: 16,
            publication_place: 17,
            language: 18,
            document_type: 19,
            author: 25,
            expected: 26,
            strict: true,
        }
    }
}

impl ColumnLayout {
    /// Smallest row length that contains every configured column.
    pub fn min_len(&self) -> usize {
        [
            self.identifier,
            self.access,
            self.enumeration,
            self.title,
            self.imprint,
            self.publication_year,
            self.publication_place,
            self.language,
            self.document_type,
            self.author,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}
