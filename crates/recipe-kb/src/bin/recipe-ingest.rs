//! Pulls recipes from the configured feeds into the relational store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use recipe_kb::{
    build_ingestion_service,
    logging::{init_tracing, with_bootstrap_logging},
    open_configured_store, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "recipe-ingest", about = "Ingest recipes from the configured feeds")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "RECIPE_KB_CONFIG")]
    config: Option<PathBuf>,

    /// Number of new recipes to store.
    #[arg(long)]
    target: Option<usize>,

    /// Fetch and normalize without writing to the store.
    #[arg(long)]
    dry_run: bool,

    /// Store location, e.g. sqlite://recipes.db.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = with_bootstrap_logging(|| PipelineConfig::load(cli.config.as_deref()))?;
    if let Some(target) = cli.target {
        config.target_count = target;
    }
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    init_tracing(&config.log)?;
    config.validate_ingestion().context("Invalid ingestion configuration")?;

    let store = open_configured_store(&config)
        .await
        .context("Failed to open recipe store")?;
    let service = build_ingestion_service(&config, store)?;

    let summary = service.ingest(config.target_count, config.dry_run).await?;

    for report in &summary.feeds {
        match &report.error {
            Some(error) => warn!(feed = %report.feed, %error, "Feed failed"),
            None => info!(
                feed = %report.feed,
                fetched = report.fetched,
                inserted = report.inserted,
                duplicates = report.duplicates,
                skipped = report.skipped,
                "Feed done"
            ),
        }
    }

    println!(
        "{} {} of {} requested recipes ({} already stored, {} skipped, {} feeds failed)",
        if summary.dry_run { "Would store" } else { "Stored" },
        summary.inserted,
        summary.requested,
        summary.duplicates,
        summary.skipped,
        summary.failed_feeds().count(),
    );
    Ok(())
}
