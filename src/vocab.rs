//! IRI constants for the vocabularies the graphs are written in.
//!
//! `rdf:` and `xsd:` come from oxigraph; schema.org and SHACL terms are
//! declared here the same way.

use oxigraph::model::{NamedNode, NamedNodeRef};

use crate::error::{CatalogError, CatalogResult, RecordError, RecordResult};

pub use oxigraph::model::vocab::{rdf, xsd};

/// `https://schema.org/` terms.
pub mod schema {
    use super::NamedNodeRef;

    pub const NAMESPACE: &str = "https://schema.org/";

    pub const CREATIVE_WORK: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/CreativeWork");
    pub const PERSON: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/Person");
    pub const ORGANIZATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/Organization");

    pub const NAME: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("https://schema.org/name");
    pub const GIVEN_NAME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/givenName");
    pub const FAMILY_NAME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/familyName");
    pub const BIRTH_DATE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/birthDate");
    pub const DEATH_DATE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/deathDate");
    pub const LOCATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/location");
    pub const IN_LANGUAGE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/inLanguage");
    pub const CONTENT_URL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/contentUrl");
    pub const POSITION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/position");
    pub const DATE_PUBLISHED: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/datePublished");
    pub const CREATOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/creator");
    pub const PUBLISHER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://schema.org/publisher");
}

/// `http://www.w3.org/ns/shacl#` terms.
pub mod shacl {
    use super::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/ns/shacl#";

    pub const NODE_SHAPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#NodeShape");
    pub const CLOSED: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#closed");
    pub const TARGET_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
    pub const PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
    pub const PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
    pub const DATATYPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#datatype");
    pub const CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#class");
    pub const LESS_THAN: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#lessThan");
    pub const MAX_INCLUSIVE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#maxInclusive");
}

/// Prefixes bound on every serialized graph.
pub fn prefixes(namespace: &str) -> [(&'static str, String); 5] {
    [
        ("cdh", namespace.to_string()),
        ("schema", schema::NAMESPACE.to_string()),
        ("sh", shacl::NAMESPACE.to_string()),
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#".to_string()),
        ("xsd", "http://www.w3.org/2001/XMLSchema#".to_string()),
    ]
}

/// Base IRI under which documents, entities and shapes are minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    base: String,
}

impl Namespace {
    /// Validate `base` as an absolute IRI ending in `/` or `#`.
    pub fn new(base: impl Into<String>) -> CatalogResult<Self> {
        let base = base.into();
        if !base.ends_with(['/', '#']) || NamedNode::new(base.as_str()).is_err() {
            return Err(CatalogError::Namespace { iri: base });
        }
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Mint `<base><local>`.
    pub fn term(&self, local: &str) -> RecordResult<NamedNode> {
        let iri = format!("{}{local}", self.base);
        NamedNode::new(iri.as_str()).map_err(|e| RecordError::InvalidIri {
            iri: iri.clone(),
            message: e.to_string(),
        })
    }
}
