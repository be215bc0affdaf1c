//! catalog-ld CLI: catalog rows to linked data.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use catalog_ld::config::PipelineConfig;
use catalog_ld::content::{ArchiveSink, ContentResolver, PairtreeFactory, ZipPackage};
use catalog_ld::geocode::{self, NominatimGeocoder, RateLimiter};
use catalog_ld::graph::{GraphSink, RdfFileSink};
use catalog_ld::input::CatalogReader;
use catalog_ld::pipeline::{Outputs, Pipeline};
use catalog_ld::shapes::{DEFAULT_SHAPES, generate_shapes};
use catalog_ld::vocab::Namespace;

#[derive(Parser)]
#[command(name = "catalog-ld", version, about = "Catalog records to linked data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the data, schema and annotation graphs from a catalog.
    Prepare {
        /// Tab-separated catalog, gzip-compressed if it ends in .gz.
        #[arg(long)]
        csv_input: PathBuf,

        /// Data graph output; the RDF syntax follows the extension.
        #[arg(long)]
        data_output: PathBuf,

        /// Shape graph output.
        #[arg(long)]
        schema_output: PathBuf,

        /// Annotation graph output.
        #[arg(long)]
        annotation_output: PathBuf,

        /// Archive root holding one pairtree store per identifier prefix.
        #[arg(long, requires = "materials_output")]
        hathitrust_path: Option<PathBuf>,

        /// Zip package for bundled document text.
        #[arg(long, requires = "hathitrust_path")]
        materials_output: Option<PathBuf>,

        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the checkpoint threshold (data-graph triples).
        #[arg(long)]
        threshold: Option<usize>,
    },

    /// Write only the shape graph.
    Shapes {
        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Geocode `<code> <name>` lines into JSON lines.
    Geocode {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Minimum seconds between lookups.
        #[arg(long, default_value_t = geocode::DEFAULT_MIN_DELAY.as_secs_f64())]
        min_delay_secs: f64,

        /// Nominatim search endpoint.
        #[arg(long, default_value = geocode::DEFAULT_ENDPOINT)]
        endpoint: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            csv_input,
            data_output,
            schema_output,
            annotation_output,
            hathitrust_path,
            materials_output,
            config,
            threshold,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(threshold) = threshold {
                config.checkpoint_threshold = threshold;
            }

            let mut data = RdfFileSink::new(data_output, &config.namespace)?;
            let mut schema = RdfFileSink::new(schema_output, &config.namespace)?;
            let mut annotation = RdfFileSink::new(annotation_output, &config.namespace)?;
            let mut package = materials_output.map(ZipPackage::create).transpose()?;
            let rows = CatalogReader::open(&csv_input)?;

            let mut pipeline = match hathitrust_path {
                Some(root) => {
                    let factory = PairtreeFactory::open(root)?;
                    Pipeline::with_content(config, ContentResolver::new(factory))?
                }
                None => Pipeline::new(config)?,
            };
            let report = pipeline.run(
                rows,
                &mut Outputs {
                    data: &mut data,
                    schema: &mut schema,
                    annotation: &mut annotation,
                    package: package.as_mut().map(|p| p as &mut dyn ArchiveSink),
                },
            )?;
            println!("{report}");
        }

        Commands::Shapes { output, config } => {
            let config = load_config(config.as_deref())?;
            let namespace = Namespace::new(config.namespace.clone())?;
            let shapes = generate_shapes(&namespace, DEFAULT_SHAPES)?;
            RdfFileSink::new(&output, &config.namespace)?.write_graph(&shapes)?;
            println!("Wrote {} shape triples to {}", shapes.len(), output.display());
        }

        Commands::Geocode {
            input,
            output,
            min_delay_secs,
            endpoint,
        } => {
            let min_delay = Duration::try_from_secs_f64(min_delay_secs).into_diagnostic()?;
            let nominatim = NominatimGeocoder::new(
                endpoint,
                geocode::DEFAULT_USER_AGENT,
                geocode::DEFAULT_TIMEOUT,
            );
            let mut geocoder = RateLimiter::new(nominatim, min_delay);

            let reader = BufReader::new(File::open(&input).into_diagnostic()?);
            let writer = BufWriter::new(File::create(&output).into_diagnostic()?);
            let summary = geocode::geocode_lines(reader, writer, &mut geocoder)?;
            println!(
                "Geocoded {} names ({} unresolved, {} malformed lines) into {}",
                summary.located,
                summary.unresolved,
                summary.malformed,
                output.display()
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::default()),
    }
}
