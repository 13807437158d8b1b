//! Recipe knowledge base: feed ingestion, embedding generation and similarity verification
//!
//! Three offline stages share one relational store: `IngestionService` fills it from
//! recipe feeds, `EmbeddingGenerationService` attaches a vector to each recipe, and
//! `QueryService` returns the recipes nearest to a text or recipe query.

// Core modules
pub mod data;
pub mod traits;
pub mod services;
pub mod embedding;
pub mod storage;

// Collaborator adapters
pub mod chat;
pub mod enrichment;
pub mod feeds;
pub mod normalize;

// Ambient
pub mod config;
pub mod logging;
pub mod retry;
pub mod similarity;

// Testing utilities, also used by the integration tests
pub mod test_utils;

// Re-export key types for convenient usage
pub use data::errors::{CoreError, FeedError, StoreError};
pub use data::identifiers::{ContentHash, RecipeId};
pub use data::entities::{Embedding, NewRecipe, RankedRecipe, Recipe};
pub use data::outcome::{FeedReport, GenerationSummary, IngestionSummary, ItemOutcome, SkipReason};

// Re-export core traits
pub use traits::{
    EmbeddingGenerator, InsertOutcome, OverviewGenerator, RawRecipe, RecipeFeed,
    RecipeNormalizer, RecipeStore,
};

// Re-export services and their collaborators
pub use services::{
    EmbeddingGenerationService, GenerationPolicy, IngestionService, QueryInput, QueryService,
};
pub use config::PipelineConfig;
pub use embedding::{create_embedding_generator, HashingEmbeddingGenerator};
#[cfg(feature = "openai")]
pub use embedding::OpenAIEmbeddingService;
pub use retry::RetryPolicy;
pub use similarity::SimilarityMetric;
pub use storage::{open_store, MemoryRecipeStore, SqliteRecipeStore};

use std::sync::Arc;
use std::time::Duration;

/// Opens the configured store, creating the schema if needed.
pub async fn open_configured_store(config: &PipelineConfig) -> Result<Arc<dyn RecipeStore>, CoreError> {
    Ok(open_store(
        &config.database_url,
        config.max_connections,
        Duration::from_secs(config.acquire_timeout_secs),
    )
    .await?)
}

/// Builds the ingestion stage from configuration.
pub fn build_ingestion_service(
    config: &PipelineConfig,
    store: Arc<dyn RecipeStore>,
) -> Result<IngestionService, CoreError> {
    let retry = RetryPolicy::from(&config.retry);
    let feeds = config
        .feeds
        .iter()
        .map(|feed| feeds::create_feed(feed, retry.attempt_timeout))
        .collect();
    let normalizer = normalize::create_normalizer(config)?;
    Ok(IngestionService::new(store, normalizer, feeds, retry))
}

/// Builds the embedding stage from configuration.
pub fn build_generation_service(
    config: &PipelineConfig,
    store: Arc<dyn RecipeStore>,
) -> Result<EmbeddingGenerationService, CoreError> {
    let generator = create_embedding_generator(&config.embedding)?;
    let service = EmbeddingGenerationService::new(store, generator, RetryPolicy::from(&config.retry));
    Ok(match enrichment::create_overview_generator(config)? {
        Some(overview) => service.with_overview(overview),
        None => service,
    })
}

/// Builds the query stage from configuration.
pub fn build_query_service(
    config: &PipelineConfig,
    store: Arc<dyn RecipeStore>,
) -> Result<QueryService, CoreError> {
    let generator = create_embedding_generator(&config.embedding)?;
    Ok(QueryService::new(
        store,
        generator,
        config.query.metric,
        RetryPolicy::from(&config.retry),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedConfig, FeedKind};

    #[tokio::test]
    async fn test_services_build_from_default_config() {
        let mut config = PipelineConfig::default();
        config.database_url = storage::MEMORY_STORE_URL.to_string();
        config.feeds.push(FeedConfig {
            name: "local".into(),
            kind: FeedKind::JsonFile,
            location: "recipes.json".into(),
            timeout_secs: None,
        });

        let store = open_configured_store(&config).await.unwrap();
        assert!(build_ingestion_service(&config, store.clone()).is_ok());
        assert!(build_generation_service(&config, store.clone()).is_ok());
        assert!(build_query_service(&config, store).is_ok());
    }
}
