//! SHACL shape generation from a static per-class constraint table.
//!
//! The shape graph depends only on the table and the namespace, never on
//! ingested data. Property-shape nodes get blank node labels derived from the
//! class name and property position, so generating twice yields equal graphs.

use oxigraph::model::{BlankNode, Graph, Literal, NamedNode, NamedNodeRef, Term, Triple};

use crate::error::RecordResult;
use crate::vocab::{Namespace, rdf, schema, shacl, xsd};

/// The value side of one constraint statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintValue {
    /// An absolute IRI, e.g. `xsd:string` or `schema:deathDate`.
    Iri(NamedNodeRef<'static>),
    /// A class minted in the pipeline namespace, e.g. `Author`.
    Class(&'static str),
    /// A typed literal, e.g. `"2022-01-01"^^xsd:date`.
    Typed {
        value: &'static str,
        datatype: NamedNodeRef<'static>,
    },
}

/// `(kind, value)`, e.g. `(sh:datatype, xsd:date)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub kind: NamedNodeRef<'static>,
    pub value: ConstraintValue,
}

impl Constraint {
    pub const fn datatype(datatype: NamedNodeRef<'static>) -> Self {
        Self {
            kind: shacl::DATATYPE,
            value: ConstraintValue::Iri(datatype),
        }
    }

    pub const fn less_than(path: NamedNodeRef<'static>) -> Self {
        Self {
            kind: shacl::LESS_THAN,
            value: ConstraintValue::Iri(path),
        }
    }

    pub const fn class(class: &'static str) -> Self {
        Self {
            kind: shacl::CLASS,
            value: ConstraintValue::Class(class),
        }
    }

    pub const fn max_inclusive(value: &'static str, datatype: NamedNodeRef<'static>) -> Self {
        Self {
            kind: shacl::MAX_INCLUSIVE,
            value: ConstraintValue::Typed { value, datatype },
        }
    }
}

/// All constraints on one property path.
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub path: NamedNodeRef<'static>,
    pub constraints: &'static [Constraint],
}

/// One entity class and its allowed properties.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSpec {
    pub class: &'static str,
    pub properties: &'static [PropertySpec],
}

/// Shapes for the three entity classes the data graph describes.
pub const DEFAULT_SHAPES: &[ShapeSpec] = &[
    ShapeSpec {
        class: "Author",
        properties: &[
            PropertySpec {
                path: schema::FAMILY_NAME,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::GIVEN_NAME,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::BIRTH_DATE,
                constraints: &[
                    Constraint::datatype(xsd::DATE),
                    Constraint::less_than(schema::DEATH_DATE),
                ],
            },
            PropertySpec {
                path: schema::DEATH_DATE,
                constraints: &[Constraint::datatype(xsd::DATE)],
            },
        ],
    },
    ShapeSpec {
        class: "Document",
        properties: &[
            PropertySpec {
                path: schema::CREATOR,
                constraints: &[Constraint::class("Author")],
            },
            PropertySpec {
                path: schema::CONTENT_URL,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::NAME,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::IN_LANGUAGE,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::DATE_PUBLISHED,
                constraints: &[Constraint::max_inclusive("2022-01-01", xsd::DATE)],
            },
            PropertySpec {
                path: schema::PUBLISHER,
                constraints: &[Constraint::class("Publisher")],
            },
            PropertySpec {
                path: schema::POSITION,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
        ],
    },
    ShapeSpec {
        class: "Publisher",
        properties: &[
            PropertySpec {
                path: schema::NAME,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
            PropertySpec {
                path: schema::LOCATION,
                constraints: &[Constraint::datatype(xsd::STRING)],
            },
        ],
    },
];

/// Build one closed `sh:NodeShape` per class in `table`.
pub fn generate_shapes(namespace: &Namespace, table: &[ShapeSpec]) -> RecordResult<Graph> {
    let mut graph = Graph::new();

    for spec in table {
        let shape = namespace.term(&format!("{}Shape", spec.class))?;
        let class = namespace.term(spec.class)?;
        insert(&mut graph, &shape, shacl::CLOSED, Literal::from(true));
        insert(&mut graph, &shape, rdf::TYPE, shacl::NODE_SHAPE.into_owned());
        insert(&mut graph, &shape, shacl::TARGET_CLASS, class);

        for (index, property) in spec.properties.iter().enumerate() {
            let node = BlankNode::new_unchecked(format!("{}Property{index}", spec.class));
            insert(&mut graph, &shape, shacl::PROPERTY, node.clone());
            insert_blank(&mut graph, &node, shacl::PATH, property.path.into_owned());
            for constraint in property.constraints {
                let value: Term = match constraint.value {
                    ConstraintValue::Iri(iri) => iri.into_owned().into(),
                    ConstraintValue::Class(class) => namespace.term(class)?.into(),
                    ConstraintValue::Typed { value, datatype } => {
                        Literal::new_typed_literal(value, datatype).into()
                    }
                };
                insert_blank(&mut graph, &node, constraint.kind, value);
            }
        }
    }

    tracing::debug!(shapes = table.len(), triples = graph.len(), "shape graph generated");
    Ok(graph)
}

fn insert(graph: &mut Graph, subject: &NamedNode, predicate: NamedNodeRef<'_>, object: impl Into<Term>) {
    graph.insert(&Triple::new(subject.clone(), predicate, object.into()));
}

fn insert_blank(graph: &mut Graph, subject: &BlankNode, predicate: NamedNodeRef<'_>, object: impl Into<Term>) {
    graph.insert(&Triple::new(subject.clone(), predicate, object.into()));
}
