//! Prints the stored recipes nearest to a text or recipe query.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use recipe_kb::{
    build_query_service,
    logging::{init_tracing, with_bootstrap_logging},
    open_configured_store, PipelineConfig, QueryInput, RecipeId, SimilarityMetric,
};

#[derive(Parser, Debug)]
#[command(name = "recipe-query", about = "Find the recipes most similar to a query")]
struct Cli {
    /// Free-text query, e.g. "spicy vegetarian curry".
    text: Option<String>,

    /// Use a stored recipe as the query instead of text.
    #[arg(long, conflicts_with = "text")]
    recipe_id: Option<i64>,

    /// Number of results.
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Similarity metric: cosine or euclidean.
    #[arg(long)]
    metric: Option<SimilarityMetric>,

    /// YAML configuration file.
    #[arg(long, env = "RECIPE_KB_CONFIG")]
    config: Option<PathBuf>,

    /// Store location, e.g. sqlite://recipes.db.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = with_bootstrap_logging(|| PipelineConfig::load(cli.config.as_deref()))?;
    if let Some(top_k) = cli.top_k {
        config.query.top_k = top_k;
    }
    if let Some(metric) = cli.metric {
        config.query.metric = metric;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    init_tracing(&config.log)?;
    config.validate().context("Invalid query configuration")?;

    let input = match (cli.text, cli.recipe_id) {
        (Some(text), None) => QueryInput::Text(text),
        (None, Some(id)) => QueryInput::Recipe(RecipeId(id)),
        _ => bail!("Provide either query text or --recipe-id"),
    };

    let store = open_configured_store(&config)
        .await
        .context("Failed to open recipe store")?;
    let service = build_query_service(&config, store)?;

    let results = service.query(&input, config.query.top_k).await?;
    if results.is_empty() {
        println!("No embedded recipes to compare against.");
        return Ok(());
    }

    println!("Top {} recipes for {} ({}):", results.len(), input, config.query.metric);
    for (rank, ranked) in results.iter().enumerate() {
        let recipe = &ranked.recipe;
        println!(
            "{:>2}. [{}] {} (score {:.4})",
            rank + 1,
            recipe.id,
            recipe.name,
            ranked.score
        );
        if let Some(cuisine) = &recipe.cuisine_type {
            println!("    cuisine: {}", cuisine);
        }
        if let Some(total) = recipe.total_time {
            println!("    total time: {} min", total);
        }
    }
    Ok(())
}
