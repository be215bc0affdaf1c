//! End-to-end tests: a gzip catalog on disk through to serialized graphs.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, TermRef, Triple};

use catalog_ld::config::PipelineConfig;
use catalog_ld::error::CatalogError;
use catalog_ld::graph::RdfFileSink;
use catalog_ld::input::CatalogReader;
use catalog_ld::pipeline::{Outputs, Pipeline, RunReport};
use catalog_ld::vocab::{rdf, schema, shacl, xsd};

const NS: &str = "http://cdh.jhu.edu/materials/";

/// One hathifile-shaped line with the columns the pipeline reads.
fn line(id: &str, access: &str, title: &str, imprint: &str, year: &str, author: &str) -> String {
    let mut fields = vec![""; 26];
    fields[0] = id;
    fields[1] = access;
    fields[11] = title;
    fields[12] = imprint;
    fields[16] = year;
    fields[17] = "mau";
    fields[18] = "eng";
    fields[19] = "BK";
    fields[25] = author;
    fields.join("\t")
}

fn write_catalog(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("hathi_full.txt.gz");
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    for l in lines {
        writeln!(encoder, "{l}").unwrap();
    }
    encoder.finish().unwrap();
    path
}

fn read_turtle(path: &Path) -> Graph {
    let mut graph = Graph::new();
    let file = File::open(path).unwrap();
    for quad in RdfParser::from_format(RdfFormat::Turtle).for_reader(file) {
        graph.insert(&Triple::from(quad.unwrap()));
    }
    graph
}

struct Run {
    report: RunReport,
    data: Graph,
    schema: Graph,
    annotation: Graph,
}

fn prepare(dir: &Path, catalog: &Path, config: PipelineConfig) -> Run {
    let paths = ["data.ttl", "schema.ttl", "annotation.ttl"].map(|name| dir.join(name));
    let mut data = RdfFileSink::new(&paths[0], &config.namespace).unwrap();
    let mut schema = RdfFileSink::new(&paths[1], &config.namespace).unwrap();
    let mut annotation = RdfFileSink::new(&paths[2], &config.namespace).unwrap();

    let mut pipeline = Pipeline::new(config).unwrap();
    let report = pipeline
        .run(
            CatalogReader::open(catalog).unwrap(),
            &mut Outputs {
                data: &mut data,
                schema: &mut schema,
                annotation: &mut annotation,
                package: None,
            },
        )
        .unwrap();

    Run {
        report,
        data: read_turtle(&paths[0]),
        schema: read_turtle(&paths[1]),
        annotation: read_turtle(&paths[2]),
    }
}

fn doc(id: &str) -> String {
    format!("{NS}{id}")
}

#[test]
fn catalog_to_turtle() {
    let dir = tempfile::TempDir::new().unwrap();
    let catalog = write_catalog(
        dir.path(),
        &[
            line(
                "mdp.39015012345678",
                "allow",
                "An Essay on Man",
                "Boston: A.B. Co, 1787",
                "1787",
                "Smith, John 1820-1895Doe, Jane",
            ),
            line("mdp.2", "deny", "Hidden", "", "1790", "Hidden, Author"),
            line("mdp.3", "allow", "Too Late", "", "1850", ""),
            line("uc1.ark:/13960/t0abc", "allow", "Tracts", "", "1799", "Doe, Jane"),
        ],
    );

    let run = prepare(dir.path(), &catalog, PipelineConfig::default());
    assert_eq!(run.report.rows, 4);
    assert_eq!(run.report.ingested, 2);
    assert_eq!(run.report.skipped_denied, 1);
    assert_eq!(run.report.skipped_after_cutoff, 1);
    assert_eq!(run.report.checkpoint.authors, 2);
    assert_eq!(run.report.checkpoint.publishers, 1);
    assert!(!run.report.halted);

    let essay = NamedNode::new(doc("mdp.39015012345678")).unwrap();
    let name = Literal::new_simple_literal("An Essay on Man");
    assert!(run.data.contains(&Triple::new(essay.clone(), schema::NAME, name)));
    assert_eq!(
        run.data
            .objects_for_subject_predicate(&essay, schema::CREATOR)
            .count(),
        2
    );
    assert_eq!(
        run.data
            .object_for_subject_predicate(&essay, schema::CONTENT_URL),
        Some(TermRef::from(NamedNodeRef::new_unchecked(
            "http://cdh.jhu.edu/materials/mdp/39015012345678"
        )))
    );

    let tracts = NamedNode::new(doc("uc1.ark:/13960/t0abc")).unwrap();
    assert_eq!(
        run.data
            .object_for_subject_predicate(&tracts, schema::CONTENT_URL),
        Some(TermRef::from(NamedNodeRef::new_unchecked(
            "http://cdh.jhu.edu/materials/uc1/ark:.13960.t0abc"
        )))
    );

    let hidden = NamedNode::new(doc("mdp.2")).unwrap();
    assert_eq!(run.data.triples_for_subject(&hidden).count(), 0);

    // Jane Doe appears on two documents but is one person.
    let persons = run
        .data
        .subjects_for_predicate_object(rdf::TYPE, schema::PERSON)
        .count();
    assert_eq!(persons, 2);

    let date = Literal::new_typed_literal("1787-01-01", xsd::DATE);
    assert!(
        run.data
            .subjects_for_predicate_object(schema::DATE_PUBLISHED, &date)
            .next()
            .is_some()
    );

    assert_eq!(
        run.schema
            .subjects_for_predicate_object(rdf::TYPE, shacl::NODE_SHAPE)
            .count(),
        3
    );
    assert!(run.annotation.is_empty());
}

#[test]
fn threshold_halts_after_crossing_record() {
    let dir = tempfile::TempDir::new().unwrap();
    let lines: Vec<_> = (0..10)
        .map(|i| line(&format!("mdp.{i}"), "allow", "Title", "", "1790", ""))
        .collect();
    let catalog = write_catalog(dir.path(), &lines);

    let config = PipelineConfig {
        checkpoint_threshold: 12,
        ..Default::default()
    };
    let run = prepare(dir.path(), &catalog, config);

    assert!(run.report.halted);
    assert_eq!(run.report.ingested, 3);
    assert_eq!(run.data.len(), 15);
    let fourth = NamedNode::new(doc("mdp.3")).unwrap();
    assert_eq!(run.data.triples_for_subject(&fourth).count(), 0);
}

#[test]
fn outputs_are_deterministic_across_runs() {
    let dir = tempfile::TempDir::new().unwrap();
    let catalog = write_catalog(
        dir.path(),
        &[line(
            "mdp.1",
            "allow",
            "T",
            "London: Wilford, 1734",
            "1734",
            "Pope, Alexander 1688-1744",
        )],
    );

    let first_dir = tempfile::TempDir::new().unwrap();
    let second_dir = tempfile::TempDir::new().unwrap();
    let first = prepare(first_dir.path(), &catalog, PipelineConfig::default());
    let second = prepare(second_dir.path(), &catalog, PipelineConfig::default());
    assert_eq!(first.data, second.data);
    assert_eq!(first.schema, second.schema);
}

#[test]
fn unwritable_output_fails_before_ingestion() {
    let dir = tempfile::TempDir::new().unwrap();
    let catalog = write_catalog(dir.path(), &[line("mdp.1", "allow", "T", "", "1790", "")]);

    let sink = RdfFileSink::new(dir.path().join("absent").join("data.ttl"), NS);
    assert!(matches!(sink, Err(CatalogError::Sink { .. })));
    // The catalog was never touched; a later run over it still works.
    let run = prepare(dir.path(), &catalog, PipelineConfig::default());
    assert_eq!(run.report.ingested, 1);
}
