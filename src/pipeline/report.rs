//! Per-record outcomes and the end-of-run report.

use std::fmt;

use crate::error::RecordError;
use crate::graph::EntityFlush;
use crate::record::{DocumentId, SkipReason};

/// What happened to a document's bundled text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentStatus {
    /// No archive root or no package configured.
    NotRequested,
    Bundled,
    /// The record's metadata was kept; only the text is missing.
    Failed(String),
}

/// Result of driving one catalog row through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Ingested {
        line: u64,
        document: DocumentId,
        /// Triples new to the data graph.
        triples: usize,
        content: ContentStatus,
    },
    Skipped {
        line: u64,
        reason: SkipReason,
    },
    Failed {
        line: u64,
        error: RecordError,
    },
}

/// Graph sizes and entity counts at the checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointSummary {
    pub data_triples: usize,
    pub schema_triples: usize,
    pub annotation_triples: usize,
    pub authors: usize,
    pub publishers: usize,
    pub entities: EntityFlush,
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rows: usize,
    pub ingested: usize,
    pub skipped_denied: usize,
    pub skipped_after_cutoff: usize,
    pub failed: usize,
    pub content_bundled: usize,
    pub content_failed: usize,
    /// Ingestion stopped at the size threshold with input left unread.
    pub halted: bool,
    pub checkpoint: CheckpointSummary,
}

impl RunReport {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.rows += 1;
        match outcome {
            RecordOutcome::Ingested { content, .. } => {
                self.ingested += 1;
                match content {
                    ContentStatus::Bundled => self.content_bundled += 1,
                    ContentStatus::Failed(_) => self.content_failed += 1,
                    ContentStatus::NotRequested => {}
                }
            }
            RecordOutcome::Skipped { reason, .. } => match reason {
                SkipReason::AccessDenied => self.skipped_denied += 1,
                SkipReason::AfterCutoff { .. } => self.skipped_after_cutoff += 1,
            },
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_denied + self.skipped_after_cutoff
    }

    /// Emit the report as one structured log event.
    pub fn log(&self) {
        tracing::info!(
            rows = self.rows,
            ingested = self.ingested,
            skipped_denied = self.skipped_denied,
            skipped_after_cutoff = self.skipped_after_cutoff,
            failed = self.failed,
            content_bundled = self.content_bundled,
            content_failed = self.content_failed,
            halted = self.halted,
            data_triples = self.checkpoint.data_triples,
            schema_triples = self.checkpoint.schema_triples,
            authors = self.checkpoint.authors,
            publishers = self.checkpoint.publishers,
            "run finished"
        );
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows read:        {}", self.rows)?;
        writeln!(f, "ingested:         {}", self.ingested)?;
        writeln!(
            f,
            "skipped:          {} (denied {}, after cutoff {})",
            self.skipped(),
            self.skipped_denied,
            self.skipped_after_cutoff
        )?;
        writeln!(f, "failed:           {}", self.failed)?;
        if self.content_bundled + self.content_failed > 0 {
            writeln!(
                f,
                "content:          {} bundled, {} failed",
                self.content_bundled, self.content_failed
            )?;
        }
        writeln!(
            f,
            "data graph:       {} triples ({} authors, {} publishers)",
            self.checkpoint.data_triples, self.checkpoint.authors, self.checkpoint.publishers
        )?;
        writeln!(f, "schema graph:     {} triples", self.checkpoint.schema_triples)?;
        if self.halted {
            writeln!(f, "halted at the checkpoint threshold")?;
        }
        Ok(())
    }
}
