use clap::{Parser, Subcommand};
use engine_proxy::config;
use engine_proxy::context::{
    FanOutMetrics, MetricsSink, RecordedHeaders, RecordedMetrics, RequestContext, TracingMetrics,
};
use engine_proxy::imaging::{Engine, Quality};
use engine_proxy::output::{self, CycleReport, EngineListing};
use engine_proxy::proxy::ProxyEngine;
use engine_proxy::registry::EngineRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Target size for `--resize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Size {
    width: u32,
    height: u32,
}

/// Edges for `--crop`; right and bottom are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropEdges {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Encoded source image
    #[arg(long)]
    input: PathBuf,

    /// Where to write the result; its extension picks the output format
    #[arg(long)]
    output: PathBuf,

    /// Extension hint passed to engine selection (default: the input's extension)
    #[arg(long)]
    extension: Option<String>,

    /// Crop before resizing, as LEFT,TOP,RIGHT,BOTTOM
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropEdges>,

    /// Resize to exactly WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    resize: Option<Size>,

    /// Lossy encoding quality (1-100, default from config)
    #[arg(long)]
    quality: Option<u32>,

    /// Print the cycle report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
#[command(name = "engine-proxy")]
#[command(about = "Route image processing to the first engine that accepts the payload")]
#[command(long_about = "\
Route image processing to the first engine that accepts the payload

Engines are tried in configured order. The first engine whose applicability
test accepts the payload handles the whole load → transform → read cycle.
Engines without a test always match and act as the fallback.

Built-in engines:
  gif     animated GIFs, every frame kept
  large   payloads with at least large.min_pixels pixels
  raster  everything else

Run 'engine-proxy gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file, which must exist (stock defaults when the flag is omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one load → crop/resize → read cycle over a file
    Process(ProcessArgs),
    /// List the configured engines in selection order
    Engines,
    /// Print a stock config with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = EngineRegistry::builtin();

    match cli.command {
        Command::Process(args) => {
            let config = Arc::new(config::load_config(cli.config.as_deref())?);
            let report = process(&registry, config, &args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_cycle_report(&report);
            }
        }
        Command::Engines => {
            let config = config::load_config(cli.config.as_deref())?;
            let listing: Vec<EngineListing> = registry
                .instantiate(&config)?
                .iter()
                .map(|candidate| EngineListing {
                    id: candidate.id.clone(),
                    has_test: candidate.engine.applicability().is_some(),
                })
                .collect();
            output::print_engine_list(&listing, &registry.ids());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run one request cycle through the proxy and write the result.
fn process(
    registry: &EngineRegistry,
    config: Arc<config::ProxyConfig>,
    args: &ProcessArgs,
) -> Result<CycleReport, Box<dyn std::error::Error>> {
    let buffer = std::fs::read(&args.input)?;
    let extension = args
        .extension
        .clone()
        .or_else(|| dotted_extension(&args.input))
        .unwrap_or_default();
    let output_extension =
        dotted_extension(&args.output).ok_or("output path needs a file extension")?;

    let headers = Arc::new(RecordedHeaders::new());
    let recorded = Arc::new(RecordedMetrics::new());
    let sinks: Vec<Arc<dyn MetricsSink>> = vec![recorded.clone(), Arc::new(TracingMetrics)];
    let context = RequestContext::new(
        config,
        headers.clone(),
        Arc::new(FanOutMetrics::new(sinks)),
    );

    let mut proxy = ProxyEngine::from_registry(registry, context)?;
    proxy.load(&buffer, &extension)?;
    let source = proxy.size()?;
    if let Some(edges) = args.crop {
        proxy.crop(edges.left, edges.top, edges.right, edges.bottom)?;
    }
    if let Some(size) = args.resize {
        proxy.resize(size.width, size.height)?;
    }
    let result = proxy.size()?;
    let encoded = proxy.read(Some(&output_extension), args.quality.map(Quality::new))?;
    std::fs::write(&args.output, &encoded)?;

    Ok(CycleReport {
        engine: proxy.selected().unwrap_or_default().to_string(),
        input: args.input.clone(),
        source_size: (source.width, source.height),
        output: args.output.clone(),
        output_size: (result.width, result.height),
        bytes_written: encoded.len(),
        headers: headers.entries(),
        metrics: recorded.samples(),
    })
}

/// `photo.JPG` → `.JPG`
fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension '{part}': {e}"))
    };
    Ok(Size {
        width: parse(width)?,
        height: parse(height)?,
    })
}

fn parse_crop(value: &str) -> Result<CropEdges, String> {
    let edges = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid crop edge '{part}': {e}"))
        })
        .collect::<Result<Vec<u32>, String>>()?;
    match edges[..] {
        [left, top, right, bottom] => Ok(CropEdges {
            left,
            top,
            right,
            bottom,
        }),
        _ => Err(format!("expected LEFT,TOP,RIGHT,BOTTOM, got '{value}'")),
    }
}
