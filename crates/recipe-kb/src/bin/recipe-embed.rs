//! Attaches an embedding vector to every stored recipe.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use recipe_kb::{
    build_generation_service,
    config::EmbeddingProvider,
    logging::{init_tracing, with_bootstrap_logging},
    open_configured_store, GenerationPolicy, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "recipe-embed", about = "Generate embeddings for stored recipes")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "RECIPE_KB_CONFIG")]
    config: Option<PathBuf>,

    /// Recompute every embedding instead of only the missing ones.
    #[arg(long)]
    regenerate: bool,

    /// Embedding provider: hashing or openai.
    #[arg(long)]
    provider: Option<EmbeddingProvider>,

    /// Append an LLM-written overview to each recipe before embedding.
    #[arg(long)]
    enrich: bool,

    /// Store location, e.g. sqlite://recipes.db.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = with_bootstrap_logging(|| PipelineConfig::load(cli.config.as_deref()))?;
    if let Some(provider) = cli.provider {
        config.embedding.provider = provider;
    }
    if cli.enrich {
        config.enrichment.enabled = true;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    init_tracing(&config.log)?;
    config.validate_generation().context("Invalid generation configuration")?;

    let store = open_configured_store(&config)
        .await
        .context("Failed to open recipe store")?;
    let service = build_generation_service(&config, store)?;

    let policy = if cli.regenerate {
        GenerationPolicy::Regenerate
    } else {
        GenerationPolicy::SkipExisting
    };
    let summary = service.generate(policy).await?;

    for (recipe_id, reason) in &summary.skipped {
        warn!(%recipe_id, %reason, "Recipe not embedded");
    }

    println!(
        "Embedded {} of {} recipes with {} (dimension {}), {} already embedded, {} skipped",
        summary.embedded,
        summary.candidates,
        summary.model,
        summary.dimension,
        summary.already_embedded,
        summary.skipped.len(),
    );
    Ok(())
}
