//! Pipeline driver: rows in, graphs and a content package out.
//!
//! Rows are processed strictly in order. After every committed record the
//! data graph size is checked against the threshold; the first record that
//! pushes it past the threshold is kept, then the driver checkpoints and
//! stops. Input that ends earlier gets the same checkpoint.

pub mod report;

use oxigraph::model::Graph;

use crate::config::PipelineConfig;
use crate::content::{ArchiveSink, ContentResolver, PairtreeFactory, StoreFactory};
use crate::error::{CatalogError, CatalogResult};
use crate::graph::{GraphAccumulator, GraphSink};
use crate::identity::{AuthorRegistry, PublisherRegistry};
use crate::record::{DocumentId, Normalization, RawRecord, RecordNormalizer};
use crate::shapes::{DEFAULT_SHAPES, generate_shapes};
use crate::vocab::Namespace;

pub use report::{CheckpointSummary, ContentStatus, RecordOutcome, RunReport};

/// Where the checkpoint writes.
pub struct Outputs<'a> {
    pub data: &'a mut dyn GraphSink,
    pub schema: &'a mut dyn GraphSink,
    pub annotation: &'a mut dyn GraphSink,
    /// Receives document text when content bundling is enabled.
    pub package: Option<&'a mut dyn ArchiveSink>,
}

/// Owns every piece of per-run state: registries, graphs, store handles.
pub struct Pipeline<F: StoreFactory = PairtreeFactory> {
    config: PipelineConfig,
    normalizer: RecordNormalizer,
    authors: AuthorRegistry,
    publishers: PublisherRegistry,
    accumulator: GraphAccumulator,
    schema: Graph,
    annotation: Graph,
    content: Option<ContentResolver<F>>,
}

impl Pipeline {
    /// A metadata-only pipeline.
    pub fn new(config: PipelineConfig) -> CatalogResult<Self> {
        Self::build(config, None)
    }
}

impl<F: StoreFactory> Pipeline<F> {
    /// A pipeline that also bundles document text from `resolver`.
    pub fn with_content(config: PipelineConfig, resolver: ContentResolver<F>) -> CatalogResult<Self> {
        Self::build(config, Some(resolver))
    }

    fn build(config: PipelineConfig, content: Option<ContentResolver<F>>) -> CatalogResult<Self> {
        config.validate()?;
        let namespace = Namespace::new(config.namespace.clone())?;
        let schema = generate_shapes(&namespace, DEFAULT_SHAPES)?;
        Ok(Self {
            normalizer: RecordNormalizer::new(&config),
            authors: AuthorRegistry::new(),
            publishers: PublisherRegistry::new(),
            accumulator: GraphAccumulator::new(namespace),
            schema,
            annotation: Graph::new(),
            content,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn data_graph(&self) -> &Graph {
        self.accumulator.graph()
    }

    pub fn schema_graph(&self) -> &Graph {
        &self.schema
    }

    pub fn authors(&self) -> &AuthorRegistry {
        &self.authors
    }

    pub fn publishers(&self) -> &PublisherRegistry {
        &self.publishers
    }

    /// Drive `rows` to completion or to the threshold, then checkpoint.
    ///
    /// Record failures are logged and counted; input, layout and sink
    /// failures abort the run.
    pub fn run<I>(&mut self, rows: I, outputs: &mut Outputs<'_>) -> CatalogResult<RunReport>
    where
        I: IntoIterator<Item = CatalogResult<RawRecord>>,
    {
        let threshold = self.config.checkpoint_threshold;
        let mut report = RunReport::default();

        for row in rows {
            let row = row?;
            self.check_layout(&row)?;

            let outcome = self.process(&row, outputs.package.as_deref_mut());
            report.record(&outcome);

            if self.accumulator.exceeds(threshold) {
                tracing::info!(
                    line = row.line,
                    triples = self.accumulator.len(),
                    threshold,
                    "checkpoint threshold exceeded, halting ingestion"
                );
                report.halted = true;
                break;
            }
        }

        report.checkpoint = self.checkpoint(outputs)?;
        report.log();
        Ok(report)
    }

    fn check_layout(&self, row: &RawRecord) -> CatalogResult<()> {
        let columns = self.normalizer.columns();
        if columns.strict && row.fields.len() != columns.expected {
            return Err(CatalogError::SchemaDrift {
                line: row.line,
                expected: columns.expected,
                actual: row.fields.len(),
            });
        }
        Ok(())
    }

    /// Normalize, stage and commit one row, then bundle its text.
    ///
    /// Registry entries are created only once the record's triples staged
    /// cleanly, so a failed row leaves no trace in the registries either.
    pub fn process(
        &mut self,
        row: &RawRecord,
        package: Option<&mut (dyn ArchiveSink + '_)>,
    ) -> RecordOutcome {
        let doc = match self.normalizer.normalize(row) {
            Ok(Normalization::Document(doc)) => doc,
            Ok(Normalization::Skipped(reason)) => {
                tracing::debug!(line = row.line, %reason, "record skipped");
                return RecordOutcome::Skipped {
                    line: row.line,
                    reason,
                };
            }
            Err(error) => {
                tracing::warn!(line = row.line, error = %error, "record dropped");
                return RecordOutcome::Failed {
                    line: row.line,
                    error,
                };
            }
        };

        let author_ids: Vec<_> = doc.authors.iter().map(|key| self.authors.peek(key)).collect();
        let publisher_id = doc.publisher.as_ref().map(|key| self.publishers.peek(key));
        let staged = match self
            .accumulator
            .stage_document(&doc, &author_ids, publisher_id.as_ref())
        {
            Ok(staged) => staged,
            Err(error) => {
                tracing::warn!(line = row.line, id = %doc.id, error = %error, "record dropped");
                return RecordOutcome::Failed {
                    line: row.line,
                    error,
                };
            }
        };

        for key in &doc.authors {
            self.authors.resolve(key);
        }
        if let Some(key) = &doc.publisher {
            self.publishers.resolve(key);
        }
        let triples = self.accumulator.commit(&staged);
        let content = self.bundle(&doc.id, package);

        RecordOutcome::Ingested {
            line: row.line,
            document: doc.id,
            triples,
            content,
        }
    }

    fn bundle(
        &mut self,
        id: &DocumentId,
        package: Option<&mut (dyn ArchiveSink + '_)>,
    ) -> ContentStatus {
        let (Some(resolver), Some(package)) = (self.content.as_mut(), package) else {
            return ContentStatus::NotRequested;
        };
        match resolver
            .resolve(id)
            .and_then(|text| package.stage_document(&id.storage_path(), &text))
        {
            Ok(()) => ContentStatus::Bundled,
            Err(error) => {
                tracing::warn!(id = %id, error = %error, "content not bundled");
                ContentStatus::Failed(error.to_string())
            }
        }
    }

    /// Flush entities and write all three graphs, then close the package.
    fn checkpoint(&mut self, outputs: &mut Outputs<'_>) -> CatalogResult<CheckpointSummary> {
        let entities = self
            .accumulator
            .flush_entities(&self.authors, &self.publishers)?;
        if entities.anomalous > 0 {
            tracing::warn!(count = entities.anomalous, "authors without a family name were left out");
        }

        outputs.data.write_graph(self.accumulator.graph())?;
        outputs.schema.write_graph(&self.schema)?;
        outputs.annotation.write_graph(&self.annotation)?;
        if let Some(package) = outputs.package.as_deref_mut() {
            package.finish()?;
        }

        Ok(CheckpointSummary {
            data_triples: self.accumulator.len(),
            schema_triples: self.schema.len(),
            annotation_triples: self.annotation.len(),
            authors: self.authors.len(),
            publishers: self.publishers.len(),
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use oxigraph::model::TermRef;

    use super::*;
    use crate::content::{ContentError, ContentResult, MemoryArchive, ObjectStore};
    use crate::error::RecordError;
    use crate::graph::MemorySink;
    use crate::record::tests::hathi_row;
    use crate::record::{AuthorKey, SkipReason};
    use crate::vocab::{rdf, schema};

    #[derive(Default)]
    struct Sinks {
        data: MemorySink,
        schema: MemorySink,
        annotation: MemorySink,
        package: MemoryArchive,
    }

    impl Sinks {
        fn outputs(&mut self) -> Outputs<'_> {
            Outputs {
                data: &mut self.data,
                schema: &mut self.schema,
                annotation: &mut self.annotation,
                package: Some(&mut self.package),
            }
        }
    }

    fn ok(rows: Vec<RawRecord>) -> Vec<CatalogResult<RawRecord>> {
        rows.into_iter().map(Ok).collect()
    }

    fn plain(line: u64, id: &str) -> RawRecord {
        hathi_row(line, id, "allow", "Title", "", "1790", "")
    }

    fn person_count(graph: &Graph) -> usize {
        graph
            .subjects_for_predicate_object(rdf::TYPE, TermRef::from(schema::PERSON))
            .count()
    }

    #[test]
    fn denied_rows_leave_no_trace() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let rows = ok(vec![hathi_row(
            1,
            "mdp.1",
            "deny",
            "T",
            "Boston: Hall, 1790",
            "1790",
            "Smith, John 1820-1895",
        )]);

        let report = pipeline.run(rows, &mut sinks.outputs()).unwrap();
        assert_eq!(report.skipped_denied, 1);
        assert!(pipeline.data_graph().is_empty());
        assert!(pipeline.authors().is_empty());
        assert!(pipeline.publishers().is_empty());
        assert_eq!(sinks.data.written.len(), 1);
        assert!(sinks.data.written[0].is_empty());
    }

    #[test]
    fn cutoff_filters_later_publications() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let rows = ok(vec![
            hathi_row(1, "mdp.1", "allow", "T", "", "1800", ""),
            hathi_row(2, "mdp.2", "allow", "T", "", "1801", ""),
        ]);

        let report = pipeline.run(rows, &mut sinks.outputs()).unwrap();
        assert_eq!(report.ingested, 1);
        assert_eq!(report.skipped_after_cutoff, 1);
        assert!(!report.halted);
    }

    #[test]
    fn repeated_author_is_one_person() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let author = "Smith, John 1820-1895";
        let rows = ok(vec![
            hathi_row(1, "mdp.1", "allow", "A", "", "1790", author),
            hathi_row(2, "mdp.2", "allow", "B", "", "1791", author),
        ]);

        pipeline.run(rows, &mut sinks.outputs()).unwrap();
        assert_eq!(pipeline.authors().len(), 1);
        assert_eq!(person_count(&sinks.data.written[0]), 1);

        let key = AuthorKey::new("John", "Smith").with_years(Some(1820), Some(1895));
        let id = pipeline.authors().get(&key).unwrap();
        let person = crate::vocab::Namespace::new(pipeline.config().namespace.clone())
            .unwrap()
            .term(id.as_str())
            .unwrap();
        // type, givenName, familyName, birthDate, deathDate
        assert_eq!(sinks.data.written[0].triples_for_subject(&person).count(), 5);
    }

    #[test]
    fn halts_after_record_crossing_threshold() {
        let config = PipelineConfig {
            checkpoint_threshold: 12,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(config).unwrap();
        let mut sinks = Sinks::default();
        // Each plain row contributes 5 triples.
        let rows = ok((1..=5).map(|i| plain(i, &format!("mdp.{i}"))).collect());

        let report = pipeline.run(rows, &mut sinks.outputs()).unwrap();
        assert!(report.halted);
        assert_eq!(report.rows, 3);
        assert_eq!(report.ingested, 3);
        assert_eq!(report.checkpoint.data_triples, 15);
        assert_eq!(sinks.data.written.len(), 1);
        assert_eq!(sinks.data.written[0].len(), 15);
    }

    #[test]
    fn short_input_still_checkpoints() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let report = pipeline.run(ok(vec![plain(1, "mdp.1")]), &mut sinks.outputs()).unwrap();

        assert!(!report.halted);
        assert_eq!(sinks.data.written.len(), 1);
        assert_eq!(sinks.schema.written.len(), 1);
        assert_eq!(sinks.annotation.written.len(), 1);
        assert!(sinks.annotation.written[0].is_empty());
        assert_eq!(&sinks.schema.written[0], pipeline.schema_graph());
        assert!(sinks.package.finished);
    }

    #[test]
    fn failed_record_is_dropped_and_run_continues() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let rows = ok(vec![
            hathi_row(1, "mdp.1", "allow", "T", "", "n.d.", ""),
            plain(2, "mdp.2"),
        ]);

        let report = pipeline.run(rows, &mut sinks.outputs()).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.ingested, 1);
    }

    #[test]
    fn staging_failure_registers_nothing() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let row = hathi_row(1, "mdp.bad id", "allow", "T", "Boston: Hall", "1790", "Doe, Jane");

        let outcome = pipeline.process(&row, None);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error: RecordError::InvalidIri { .. },
                ..
            }
        ));
        assert!(pipeline.authors().is_empty());
        assert!(pipeline.publishers().is_empty());
        assert!(pipeline.data_graph().is_empty());
    }

    #[test]
    fn column_drift_aborts_strict_runs() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let mut short = plain(1, "mdp.1");
        short.fields.pop();

        let err = pipeline.run(ok(vec![short]), &mut sinks.outputs()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SchemaDrift {
                line: 1,
                expected: 26,
                actual: 25,
            }
        ));
        assert!(sinks.data.written.is_empty());
    }

    #[test]
    fn column_drift_fails_only_the_row_when_lenient() {
        let mut config = PipelineConfig::default();
        config.columns.strict = false;
        let mut pipeline = Pipeline::new(config).unwrap();
        let mut sinks = Sinks::default();
        let mut short = plain(1, "mdp.1");
        short.fields.pop();

        let report = pipeline
            .run(ok(vec![short, plain(2, "mdp.2")]), &mut sinks.outputs())
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.ingested, 1);
    }

    #[test]
    fn input_errors_abort_the_run() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let mut sinks = Sinks::default();
        let rows = vec![
            Ok(plain(1, "mdp.1")),
            Err(CatalogError::InputRead {
                line: 2,
                message: "corrupt deflate stream".into(),
            }),
        ];
        assert!(matches!(
            pipeline.run(rows, &mut sinks.outputs()),
            Err(CatalogError::InputRead { line: 2, .. })
        ));
    }

    struct EmptyStore;

    impl ObjectStore for EmptyStore {
        fn list_parts(&self, object: &str, _part: Option<&str>) -> ContentResult<Vec<String>> {
            Err(ContentError::NotFound {
                object: object.into(),
            })
        }

        fn read_bytestream(&self, object: &str, _path: &str) -> ContentResult<Vec<u8>> {
            Err(ContentError::NotFound {
                object: object.into(),
            })
        }
    }

    struct EmptyFactory;

    impl StoreFactory for EmptyFactory {
        type Store = EmptyStore;

        fn open_store(&self, _prefix: &str) -> ContentResult<EmptyStore> {
            Ok(EmptyStore)
        }
    }

    #[test]
    fn content_failure_keeps_metadata() {
        let mut pipeline =
            Pipeline::with_content(PipelineConfig::default(), ContentResolver::new(EmptyFactory))
                .unwrap();
        let mut sinks = Sinks::default();

        let report = pipeline.run(ok(vec![plain(1, "mdp.1")]), &mut sinks.outputs()).unwrap();
        assert_eq!(report.ingested, 1);
        assert_eq!(report.content_failed, 1);
        assert_eq!(report.checkpoint.data_triples, 5);
        assert!(sinks.package.entries.is_empty());
    }

    #[test]
    fn skip_reason_is_reported() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let row = hathi_row(7, "mdp.1", "allow", "T", "", "1850", "");
        assert_eq!(
            pipeline.process(&row, None),
            RecordOutcome::Skipped {
                line: 7,
                reason: SkipReason::AfterCutoff { year: 1850 },
            }
        );
    }
}
