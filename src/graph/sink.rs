//! Graph sinks: where finished graphs are serialized at checkpoint time.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::Graph;

use crate::error::{CatalogError, CatalogResult};
use crate::vocab;

/// Destination for one serialized graph.
pub trait GraphSink {
    fn write_graph(&mut self, graph: &Graph) -> CatalogResult<()>;
}

/// Serializes a graph to a file, choosing the RDF syntax from its extension.
///
/// The file is created up front so an unwritable output fails the run before
/// any row is read. Writing again later recreates it.
#[derive(Debug)]
pub struct RdfFileSink {
    path: PathBuf,
    format: RdfFormat,
    namespace: String,
    file: Option<File>,
}

impl RdfFileSink {
    /// Turtle unless the extension names another RDF syntax.
    pub fn new(path: impl Into<PathBuf>, namespace: &str) -> CatalogResult<Self> {
        let path = path.into();
        let format = match path.extension().and_then(|e| e.to_str()) {
            None => RdfFormat::Turtle,
            Some(ext) => RdfFormat::from_extension(ext).ok_or_else(|| CatalogError::UnknownFormat {
                path: path.display().to_string(),
            })?,
        };
        let file = File::create(&path).map_err(|e| CatalogError::Sink {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            path,
            format,
            namespace: namespace.to_string(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    fn sink_error(&self, message: impl std::fmt::Display) -> CatalogError {
        CatalogError::Sink {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl GraphSink for RdfFileSink {
    fn write_graph(&mut self, graph: &Graph) -> CatalogResult<()> {
        let file = match self.file.take() {
            Some(file) => file,
            None => File::create(&self.path).map_err(|e| self.sink_error(e))?,
        };

        let mut serializer = RdfSerializer::from_format(self.format);
        for (prefix, iri) in vocab::prefixes(&self.namespace) {
            serializer = serializer
                .with_prefix(prefix, iri)
                .map_err(|e| self.sink_error(e))?;
        }
        let mut writer = serializer.for_writer(BufWriter::new(file));
        for triple in graph.iter() {
            writer.serialize_triple(triple).map_err(|e| self.sink_error(e))?;
        }
        writer
            .finish()
            .map_err(|e| self.sink_error(e))?
            .flush()
            .map_err(|e| self.sink_error(e))?;

        tracing::info!(path = %self.path.display(), triples = graph.len(), "graph written");
        Ok(())
    }
}

/// Keeps a copy of every graph written to it.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub written: Vec<Graph>,
}

impl GraphSink for MemorySink {
    fn write_graph(&mut self, graph: &Graph) -> CatalogResult<()> {
        self.written.push(graph.clone());
        Ok(())
    }
}
