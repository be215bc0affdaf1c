//! Data-graph accumulation.
//!
//! Per record, the accumulator stages every triple first and commits them
//! together, so a record that fails midway leaves no partial facts behind.
//! Entity facts (people, organizations) are written only at checkpoint time,
//! from the identity registries.

pub mod sink;

use oxigraph::model::{Graph, Literal, NamedNode, Triple};

use crate::error::RecordResult;
use crate::identity::{AuthorRegistry, PublisherRegistry, StableId};
use crate::record::{AuthorKey, NormalizedRecord, PublisherKey};
use crate::vocab::{Namespace, rdf, schema, xsd};

pub use sink::{GraphSink, MemorySink, RdfFileSink};

/// The triples one record contributes, not yet in the graph.
#[derive(Debug, Clone, Default)]
pub struct StagedTriples {
    triples: Vec<Triple>,
}

impl StagedTriples {
    fn push(&mut self, subject: &NamedNode, predicate: impl Into<NamedNode>, object: impl Into<oxigraph::model::Term>) {
        self.triples
            .push(Triple::new(subject.clone(), predicate.into(), object.into()));
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }
}

/// Counts from writing registry entities into the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFlush {
    pub persons: usize,
    pub named_only: usize,
    pub anomalous: usize,
    pub organizations: usize,
}

/// Builds the data graph for documents, authors and publishers.
#[derive(Debug)]
pub struct GraphAccumulator {
    namespace: Namespace,
    graph: Graph,
}

impl GraphAccumulator {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            graph: Graph::new(),
        }
    }

    /// Build a record's document triples without touching the graph.
    pub fn stage_document(
        &self,
        doc: &NormalizedRecord,
        authors: &[StableId<AuthorKey>],
        publisher: Option<&StableId<PublisherKey>>,
    ) -> RecordResult<StagedTriples> {
        let subject = self.namespace.term(doc.id.as_str())?;
        let content_url = self.namespace.term(&doc.id.storage_path())?;
        let mut staged = StagedTriples::default();

        for author in authors {
            staged.push(&subject, schema::CREATOR, self.namespace.term(author.as_str())?);
        }
        staged.push(&subject, schema::CONTENT_URL, content_url);
        staged.push(&subject, rdf::TYPE, schema::CREATIVE_WORK.into_owned());
        staged.push(&subject, schema::NAME, Literal::new_simple_literal(&doc.title));
        staged.push(
            &subject,
            schema::IN_LANGUAGE,
            Literal::new_typed_literal(&doc.language, xsd::LANGUAGE),
        );
        if let Some(enumeration) = &doc.enumeration {
            staged.push(&subject, schema::POSITION, Literal::new_simple_literal(enumeration));
        }
        if let Some(date) = &doc.publication_date {
            staged.push(
                &subject,
                schema::DATE_PUBLISHED,
                Literal::new_typed_literal(date, xsd::DATE),
            );
        }
        if let Some(publisher) = publisher {
            staged.push(&subject, schema::PUBLISHER, self.namespace.term(publisher.as_str())?);
        }

        Ok(staged)
    }

    /// Insert staged triples; returns how many were new to the graph.
    pub fn commit(&mut self, staged: &StagedTriples) -> usize {
        staged
            .iter()
            .filter(|triple| self.graph.insert(*triple))
            .count()
    }

    /// Write Person/Organization facts for every registered entity.
    ///
    /// Authors with both name parts get full person facts, authors with only a
    /// family name get a single `name`, and authors with neither are logged and
    /// contribute nothing.
    pub fn flush_entities(
        &mut self,
        authors: &AuthorRegistry,
        publishers: &PublisherRegistry,
    ) -> RecordResult<EntityFlush> {
        let mut staged = StagedTriples::default();
        let mut counts = EntityFlush::default();

        for (key, id) in authors.iter() {
            let subject = self.namespace.term(id.as_str())?;
            if key.is_full() {
                staged.push(&subject, rdf::TYPE, schema::PERSON.into_owned());
                staged.push(&subject, schema::GIVEN_NAME, Literal::new_simple_literal(&key.given));
                staged.push(&subject, schema::FAMILY_NAME, Literal::new_simple_literal(&key.family));
                if let Some(birth) = key.birth {
                    staged.push(&subject, schema::BIRTH_DATE, year_date(birth));
                }
                if let Some(death) = key.death {
                    staged.push(&subject, schema::DEATH_DATE, year_date(death));
                }
                counts.persons += 1;
            } else if !key.family.is_empty() {
                staged.push(&subject, schema::NAME, Literal::new_simple_literal(&key.family));
                counts.named_only += 1;
            } else {
                tracing::warn!(
                    id = %id,
                    given = %key.given,
                    birth = ?key.birth,
                    death = ?key.death,
                    "odd author entry without a family name, no facts written"
                );
                counts.anomalous += 1;
            }
        }

        for (key, id) in publishers.iter() {
            let subject = self.namespace.term(id.as_str())?;
            staged.push(&subject, schema::NAME, Literal::new_simple_literal(&key.name));
            staged.push(&subject, rdf::TYPE, schema::ORGANIZATION.into_owned());
            staged.push(&subject, schema::LOCATION, Literal::new_simple_literal(&key.place));
            counts.organizations += 1;
        }

        self.commit(&staged);
        Ok(counts)
    }

    /// Number of distinct triples in the data graph.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn exceeds(&self, threshold: usize) -> bool {
        self.graph.len() > threshold
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

fn year_date(year: i32) -> Literal {
    Literal::new_typed_literal(format!("{year}-01-01"), xsd::DATE)
}

#[cfg(test)]
mod tests {
    use oxigraph::model::{NamedNodeRef, TermRef};

    use super::*;
    use crate::record::DocumentId;

    fn accumulator() -> GraphAccumulator {
        GraphAccumulator::new(Namespace::new("http://cdh.jhu.edu/materials/").unwrap())
    }

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            id: DocumentId::new("mdp.39015012345678"),
            enumeration: Some("v.2".into()),
            title: "An Essay on Man".into(),
            publication_date: Some("1787-01-01".into()),
            publication_place: "mau".into(),
            language: "eng".into(),
            document_type: "BK".into(),
            authors: vec![AuthorKey::new("Alexander", "Pope").with_years(Some(1688), Some(1744))],
            publisher: Some(PublisherKey::new("Boston AB Co", "mau")),
        }
    }

    fn objects<'a>(graph: &'a Graph, subject: &'a NamedNode, predicate: NamedNodeRef<'a>) -> Vec<TermRef<'a>> {
        graph.objects_for_subject_predicate(subject, predicate).collect()
    }

    #[test]
    fn document_triples() {
        let mut acc = accumulator();
        let doc = record();
        let author = StableId::derive(&doc.authors[0]);
        let publisher = StableId::derive(doc.publisher.as_ref().unwrap());

        let staged = acc.stage_document(&doc, &[author.clone()], Some(&publisher)).unwrap();
        assert_eq!(staged.len(), 8);
        assert!(acc.is_empty());
        assert_eq!(acc.commit(&staged), 8);

        let subject = NamedNode::new("http://cdh.jhu.edu/materials/mdp.39015012345678").unwrap();
        let graph = acc.graph();
        assert_eq!(
            objects(graph, &subject, schema::CONTENT_URL),
            vec![TermRef::from(NamedNodeRef::new_unchecked(
                "http://cdh.jhu.edu/materials/mdp/39015012345678"
            ))]
        );
        let date = Literal::new_typed_literal("1787-01-01", xsd::DATE);
        assert_eq!(objects(graph, &subject, schema::DATE_PUBLISHED), vec![TermRef::from(&date)]);
        let creator = NamedNode::new(format!("http://cdh.jhu.edu/materials/{author}")).unwrap();
        assert_eq!(objects(graph, &subject, schema::CREATOR), vec![TermRef::from(&creator)]);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let acc = accumulator();
        let doc = NormalizedRecord {
            enumeration: None,
            publication_date: None,
            publisher: None,
            authors: Vec::new(),
            ..record()
        };
        let staged = acc.stage_document(&doc, &[], None).unwrap();
        // contentUrl, type, name, inLanguage
        assert_eq!(staged.len(), 4);
    }

    #[test]
    fn empty_language_still_emitted() {
        let acc = accumulator();
        let doc = NormalizedRecord {
            language: String::new(),
            ..record()
        };
        let staged = acc.stage_document(&doc, &[], None).unwrap();
        assert!(staged.iter().any(|t| t.predicate.as_ref() == schema::IN_LANGUAGE));
    }

    #[test]
    fn invalid_identifier_stages_nothing() {
        let acc = accumulator();
        let doc = NormalizedRecord {
            id: DocumentId::new("mdp.bad id"),
            ..record()
        };
        assert!(acc.stage_document(&doc, &[], None).is_err());
        assert!(acc.is_empty());
    }

    #[test]
    fn committing_twice_is_idempotent() {
        let mut acc = accumulator();
        let staged = acc.stage_document(&record(), &[], None).unwrap();
        let first = acc.commit(&staged);
        assert_eq!(acc.commit(&staged), 0);
        assert_eq!(acc.len(), first);
    }

    #[test]
    fn entity_facts_follow_name_completeness() {
        let mut acc = accumulator();
        let mut authors = AuthorRegistry::new();
        let mut publishers = PublisherRegistry::new();
        let full = authors.resolve(&AuthorKey::new("John", "Smith").with_years(Some(1820), None));
        let family_only = authors.resolve(&AuthorKey::new("", "Anonymous"));
        authors.resolve(&AuthorKey::new("Orphan", ""));
        publishers.resolve(&PublisherKey::new("Boston AB Co", "mau"));

        let counts = acc.flush_entities(&authors, &publishers).unwrap();
        assert_eq!(
            counts,
            EntityFlush {
                persons: 1,
                named_only: 1,
                anomalous: 1,
                organizations: 1,
            }
        );
        // 4 person facts (type, given, family, birth) + 1 name + 3 organization facts
        assert_eq!(acc.len(), 8);

        let ns = acc.namespace().clone();
        let graph = acc.graph();
        let full = ns.term(full.as_str()).unwrap();
        assert!(objects(graph, &full, schema::DEATH_DATE).is_empty());
        let family_only = ns.term(family_only.as_str()).unwrap();
        assert_eq!(graph.triples_for_subject(&family_only).count(), 1);
    }

    #[test]
    fn duplicate_author_yields_one_fact_set() {
        let mut acc = accumulator();
        let mut authors = AuthorRegistry::new();
        let key = AuthorKey::new("Jane", "Doe");
        authors.resolve(&key);
        authors.resolve(&key);
        acc.flush_entities(&authors, &PublisherRegistry::new()).unwrap();
        // type, givenName, familyName
        assert_eq!(acc.len(), 3);
    }
}
