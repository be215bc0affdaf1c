// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # catalog-ld
//!
//! Turns a tab-separated library catalog into linked data: a data graph of
//! documents, authors and publishers, a SHACL shape graph describing it, and
//! optionally a zip package of each document's full text.
//!
//! ## Architecture
//!
//! - **Normalization** (`record`): fixed-position rows to typed documents,
//!   author keys and publisher keys
//! - **Identity** (`identity`): MD5-derived stable ids, one typed registry per
//!   entity kind
//! - **Graphs** (`graph`, `shapes`): oxigraph data graph with staged per-record
//!   commits; static shape table
//! - **Content** (`content`): pairtree object store reader and zip package writer
//! - **Driver** (`pipeline`): ordered ingestion with a size-threshold checkpoint
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use catalog_ld::config::PipelineConfig;
//! use catalog_ld::graph::RdfFileSink;
//! use catalog_ld::input::CatalogReader;
//! use catalog_ld::pipeline::{Outputs, Pipeline};
//!
//! let config = PipelineConfig::default();
//! let mut pipeline = Pipeline::new(config.clone()).unwrap();
//! let mut data = RdfFileSink::new("data.ttl", &config.namespace).unwrap();
//! let mut schema = RdfFileSink::new("schema.ttl", &config.namespace).unwrap();
//! let mut annotation = RdfFileSink::new("annotation.ttl", &config.namespace).unwrap();
//! let rows = CatalogReader::open(Path::new("hathi_full.txt.gz")).unwrap();
//! let report = pipeline
//!     .run(
//!         rows,
//!         &mut Outputs {
//!             data: &mut data,
//!             schema: &mut schema,
//!             annotation: &mut annotation,
//!             package: None,
//!         },
//!     )
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod geocode;
pub mod graph;
pub mod identity;
pub mod input;
pub mod pipeline;
pub mod record;
pub mod shapes;
pub mod vocab;
