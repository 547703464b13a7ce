use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use texture_shrink::batch::{BatchRunner, collect_items};
use texture_shrink::codec::CodecRegistry;
use texture_shrink::config::{EmbedderKind, ShrinkConfig, parse_reduce_by};
use texture_shrink::embedding::{EmbeddingProvider, HttpEmbeddingProvider, ThumbnailProvider};
use texture_shrink::engine::ReductionEngine;

/// Shrink game textures as far as they go without visibly losing detail.
#[derive(Parser, Debug)]
#[command(name = "texshrink")]
#[command(about = "Halve texture resolution while perceptual quality stays above a threshold")]
#[command(long_about = "Repeatedly halves each texture, picking the best sharpen/detail blend at every
level, and keeps the smallest version whose embedding similarity to the original stays
above 1 - reduceby. Reduced textures are written under the output directory,
mirroring the input layout.")]
struct Args {
    /// Texture file to process (repeatable)
    #[arg(short, long = "file", help = "Texture file to process; may be given several times")]
    files: Vec<PathBuf>,

    /// Directory to walk recursively (repeatable)
    #[arg(short, long = "directory", help = "Directory searched recursively for supported textures")]
    directories: Vec<PathBuf>,

    #[arg(short, long, default_value = ".", help = "Existing directory that receives reduced textures")]
    output: PathBuf,

    /// Accepted quality loss
    #[arg(short = 'r', long = "reduceby",
          help = "Accepted quality loss as a fraction (0.25) or percentage (25%); nothing is reduced without it")]
    reduce_by: Option<String>,

    #[arg(short = 'm', long = "mindimension", default_value_t = 32,
          help = "Textures are never reduced to this size or below (must be > 2)")]
    min_dimension: u32,

    #[arg(short, long, help = "List files and report every texture")]
    verbose: bool,

    #[arg(long, help = "Print the summary as JSON")]
    json: bool,

    #[arg(long, default_value = "thumbnail", help = "Embedding backend: thumbnail (local) or http")]
    embedder: String,

    #[arg(long, help = "Embedding endpoint for --embedder http")]
    embed_url: Option<String>,

    #[arg(long, help = "Model name sent to the embedding endpoint")]
    embed_model: Option<String>,

    #[arg(long, default_value_t = 30, help = "Per-request timeout for the embedding endpoint")]
    embed_timeout_secs: u64,

    #[arg(long, help = "Score the candidates of each level in parallel")]
    parallel: bool,

    #[arg(long, default_value = "magick", help = "External converter used for .dds textures")]
    dds_tool: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "info,texture_shrink=debug,texshrink=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = build_config(args)?;
    config.validate()?;

    let registry = CodecRegistry::with_dds_tool(config.dds_tool.clone());
    let items = collect_items(&config.files, &config.directories, &registry)?;

    if config.verbose {
        log::debug!("Files to process:");
        for item in &items {
            log::debug!("'{}' from '{}'", item.relative.display(), item.root.display());
        }
    }

    let Some(bounds) = config.to_bounds() else {
        log::info!("No --reduceby given, nothing to do");
        return Ok(());
    };
    if items.is_empty() {
        println!("No files supplied!");
        return Ok(());
    }

    let provider = build_provider(&config)?;
    let engine = ReductionEngine::with_options(provider, config.to_engine_options());
    let runner = BatchRunner::new(engine, registry, config.output.clone(), bounds);
    let summary = runner.run(&items)?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

fn build_config(args: Args) -> Result<ShrinkConfig> {
    let reduce_by = args.reduce_by.as_deref().map(parse_reduce_by).transpose()?;
    let mut config = ShrinkConfig::new(
        args.files,
        args.directories,
        args.output,
        reduce_by,
        args.min_dimension,
    );
    config.verbose = args.verbose;
    config.json = args.json;
    config.embedder = args.embedder.parse::<EmbedderKind>()?;
    config.embed_url = args.embed_url;
    config.embed_model = args.embed_model;
    config.embed_timeout = Duration::from_secs(args.embed_timeout_secs);
    config.parallel = args.parallel;
    config.dds_tool = args.dds_tool;
    Ok(config)
}

fn build_provider(config: &ShrinkConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedder {
        EmbedderKind::Thumbnail => Ok(Arc::new(ThumbnailProvider::new(config.thumbnail_side)?)),
        EmbedderKind::Http => {
            let http = config
                .to_http_config()
                .ok_or_else(|| anyhow::anyhow!("--embed-url is required for --embedder http"))?;
            log::info!("Scoring with embedding server at {}", http.endpoint);
            Ok(Arc::new(HttpEmbeddingProvider::new(http)?))
        }
    }
}
