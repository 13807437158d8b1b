//! Embedding generation: stored recipes -> text -> vectors -> embedding table

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::data::{CoreError, Embedding, GenerationSummary, ItemOutcome, Recipe, SkipReason, StoreError};
use crate::embedding::{format_recipe_text, has_embeddable_content};
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::{EmbeddingGenerator, OverviewGenerator, RecipeStore};

/// Which recipes a generation run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPolicy {
    /// Only recipes without an embedding; re-running is a no-op.
    #[default]
    SkipExisting,
    /// Every recipe, overwriting stored vectors. Vectors of another dimension are
    /// cleared only after the first new vector has been produced.
    Regenerate,
}

pub struct EmbeddingGenerationService {
    store: Arc<dyn RecipeStore>,
    generator: Arc<dyn EmbeddingGenerator>,
    overview: Option<Arc<dyn OverviewGenerator>>,
    retry: RetryPolicy,
}

impl EmbeddingGenerationService {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        generator: Arc<dyn EmbeddingGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            overview: None,
            retry,
        }
    }

    /// Appends an LLM overview to each recipe's text before embedding it.
    pub fn with_overview(mut self, overview: Arc<dyn OverviewGenerator>) -> Self {
        self.overview = Some(overview);
        self
    }

    /// Embeds the recipes selected by `policy`.
    ///
    /// A recipe that cannot be embedded is skipped with a reason; the run fails only when
    /// the generator's dimension conflicts with stored vectors (outside `Regenerate`) or
    /// when there were candidates and none of them could be embedded.
    #[instrument(skip(self), fields(model = %self.generator.model_id()))]
    pub async fn generate(&self, policy: GenerationPolicy) -> Result<GenerationSummary, CoreError> {
        let dimension = self.generator.dimension();
        if dimension == 0 {
            return Err(CoreError::ConfigError("embedding dimension must be positive".into()));
        }

        let stored_dimension = self.store.embedding_dimension().await?;
        let candidates = match policy {
            GenerationPolicy::SkipExisting => {
                if let Some(expected) = stored_dimension.filter(|d| *d != dimension) {
                    error!(expected, actual = dimension, "Generator dimension conflicts with stored embeddings");
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: dimension,
                    }
                    .into());
                }
                self.store.recipes_without_embeddings().await?
            }
            GenerationPolicy::Regenerate => self.store.list_recipes().await?,
        };
        // Vectors of another dimension are dropped once the first replacement exists
        let mut stale_dimension = match policy {
            GenerationPolicy::Regenerate => stored_dimension.filter(|d| *d != dimension),
            GenerationPolicy::SkipExisting => None,
        };

        let mut summary = GenerationSummary {
            candidates: candidates.len(),
            model: self.generator.model_id(),
            dimension,
            ..Default::default()
        };
        if policy == GenerationPolicy::SkipExisting {
            summary.already_embedded = self.store.count_embeddings().await?;
        }
        info!(
            candidates = summary.candidates,
            already_embedded = summary.already_embedded,
            ?policy,
            "Starting embedding generation"
        );

        for (index, recipe) in candidates.iter().enumerate() {
            debug!(recipe_id = %recipe.id, "Processing recipe {} of {}", index + 1, candidates.len());
            let outcome = match self.embed_recipe(recipe, dimension).await {
                Ok(embedding) => {
                    if let Some(previous) = stale_dimension.take() {
                        let removed = self.store.clear_embeddings().await?;
                        warn!(removed, previous, dimension, "Cleared embeddings of a different dimension");
                    }
                    self.store_embedding(&embedding).await
                }
                Err(reason) => ItemOutcome::Skipped(reason),
            };
            match outcome {
                ItemOutcome::Ok(()) => summary.embedded += 1,
                ItemOutcome::Skipped(reason) => {
                    warn!(recipe_id = %recipe.id, name = %recipe.name, reason = %reason, "Skipping recipe");
                    summary.skipped.push((recipe.id, reason));
                }
            }
        }

        if summary.candidates > 0 && summary.embedded == 0 {
            error!(candidates = summary.candidates, "No embeddings could be generated");
            return Err(CoreError::NoEmbeddingsGenerated {
                candidates: summary.candidates,
            });
        }

        info!(
            embedded = summary.embedded,
            skipped = summary.skipped.len(),
            "Embedding generation finished"
        );
        Ok(summary)
    }

    /// Builds a validated embedding for `recipe` without touching the store.
    async fn embed_recipe(&self, recipe: &Recipe, dimension: usize) -> Result<Embedding, SkipReason> {
        if !has_embeddable_content(recipe) {
            return Err(SkipReason::EmptyText);
        }

        let overview = match &self.overview {
            Some(generator) => match generator.generate_overview(recipe).await {
                Ok(overview) => Some(overview),
                Err(e) => {
                    warn!(recipe_id = %recipe.id, error = %e, "Overview unavailable, embedding plain text");
                    None
                }
            },
            None => None,
        };
        let text = format_recipe_text(recipe, overview.as_deref());

        let vector = match with_retry(&self.retry, "generate embedding", || {
            self.generator.generate_embedding(&text)
        })
        .await
        {
            Ok(vector) => vector,
            Err(e) => return Err(SkipReason::EmbeddingFailed(e.to_string())),
        };

        if vector.len() != dimension {
            return Err(SkipReason::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(SkipReason::EmbeddingFailed("vector has non-finite values".into()));
        }

        Ok(Embedding::new(recipe.id, vector, self.generator.model_id()))
    }

    async fn store_embedding(&self, embedding: &Embedding) -> ItemOutcome<()> {
        match self.store.upsert_embedding(embedding).await {
            Ok(()) => ItemOutcome::Ok(()),
            Err(StoreError::DimensionMismatch { expected, actual }) => {
                ItemOutcome::Skipped(SkipReason::DimensionMismatch { expected, actual })
            }
            Err(e) => ItemOutcome::Skipped(SkipReason::StoreRejected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingGenerator;
    use crate::storage::MemoryRecipeStore;
    use crate::test_utils::fakes::{FailingEmbeddingGenerator, StaticOverviewGenerator};
    use crate::test_utils::fixtures::sample_recipe;
    use crate::traits::MockEmbeddingGenerator;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(1),
            max_attempts: 2,
            delay: Duration::from_millis(1),
        }
    }

    async fn seeded_store(names: &[&str]) -> Arc<MemoryRecipeStore> {
        let store = Arc::new(MemoryRecipeStore::new());
        for name in names {
            store.insert_recipe(&sample_recipe(name)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_embeds_every_recipe_once() {
        let store = seeded_store(&["Pho", "Ramen", "Udon"]).await;
        let service = EmbeddingGenerationService::new(
            store.clone(),
            Arc::new(HashingEmbeddingGenerator::new(16)),
            policy(),
        );

        let first = service.generate(GenerationPolicy::SkipExisting).await.unwrap();
        assert_eq!(first.embedded, 3);
        assert_eq!(first.model, "hashing-16");

        let second = service.generate(GenerationPolicy::SkipExisting).await.unwrap();
        assert_eq!(second.candidates, 0);
        assert_eq!(second.already_embedded, 3);
        assert_eq!(store.count_embeddings().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let store = seeded_store(&["Good Soup", "Poison Pie", "Fine Stew"]).await;
        let generator = FailingEmbeddingGenerator::new(8, "Poison");
        let service = EmbeddingGenerationService::new(store.clone(), Arc::new(generator), policy());

        let summary = service.generate(GenerationPolicy::SkipExisting).await.unwrap();
        assert_eq!(summary.embedded, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert!(matches!(summary.skipped[0].1, SkipReason::EmbeddingFailed(_)));
    }

    #[tokio::test]
    async fn test_all_failures_are_fatal() {
        let store = seeded_store(&["Poison Pie", "Poison Tart"]).await;
        let generator = FailingEmbeddingGenerator::new(8, "Poison");
        let service = EmbeddingGenerationService::new(store, Arc::new(generator), policy());

        let result = service.generate(GenerationPolicy::SkipExisting).await;
        assert!(matches!(result, Err(CoreError::NoEmbeddingsGenerated { candidates: 2 })));
    }

    #[tokio::test]
    async fn test_wrong_length_vector_is_skipped() {
        let store = seeded_store(&["Toast", "Jam"]).await;
        let mut generator = MockEmbeddingGenerator::new();
        generator.expect_dimension().return_const(4usize);
        generator.expect_model_id().return_const("mock".to_string());
        let mut calls = 0;
        generator.expect_generate_embedding().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![0.5; 4])
            } else {
                Ok(vec![0.5; 3])
            }
        });

        let service = EmbeddingGenerationService::new(store, Arc::new(generator), policy());
        let summary = service.generate(GenerationPolicy::SkipExisting).await.unwrap();

        assert_eq!(summary.embedded, 1);
        assert_eq!(
            summary.skipped[0].1,
            SkipReason::DimensionMismatch { expected: 4, actual: 3 }
        );
    }

    #[tokio::test]
    async fn test_dimension_conflict_fails_unless_regenerating() {
        let store = seeded_store(&["Falafel", "Hummus"]).await;
        EmbeddingGenerationService::new(store.clone(), Arc::new(HashingEmbeddingGenerator::new(8)), policy())
            .generate(GenerationPolicy::SkipExisting)
            .await
            .unwrap();

        let wider = EmbeddingGenerationService::new(
            store.clone(),
            Arc::new(HashingEmbeddingGenerator::new(32)),
            policy(),
        );
        assert!(matches!(
            wider.generate(GenerationPolicy::SkipExisting).await,
            Err(CoreError::Store(StoreError::DimensionMismatch { expected: 8, actual: 32 }))
        ));

        let summary = wider.generate(GenerationPolicy::Regenerate).await.unwrap();
        assert_eq!(summary.embedded, 2);
        assert_eq!(store.embedding_dimension().await.unwrap(), Some(32));
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_previous_embeddings() {
        let store = seeded_store(&["Falafel", "Hummus", "Tabbouleh"]).await;
        EmbeddingGenerationService::new(store.clone(), Arc::new(HashingEmbeddingGenerator::new(8)), policy())
            .generate(GenerationPolicy::SkipExisting)
            .await
            .unwrap();

        // Every rendered recipe text starts with "Recipe:"
        let broken = EmbeddingGenerationService::new(
            store.clone(),
            Arc::new(FailingEmbeddingGenerator::new(32, "Recipe:")),
            policy(),
        );
        let result = broken.generate(GenerationPolicy::Regenerate).await;

        assert!(matches!(result, Err(CoreError::NoEmbeddingsGenerated { candidates: 3 })));
        assert_eq!(store.count_embeddings().await.unwrap(), 3);
        assert_eq!(store.embedding_dimension().await.unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_regeneration_clears_stale_dimension_after_first_success() {
        let store = seeded_store(&["Falafel", "Hummus", "Tabbouleh"]).await;
        EmbeddingGenerationService::new(store.clone(), Arc::new(HashingEmbeddingGenerator::new(8)), policy())
            .generate(GenerationPolicy::SkipExisting)
            .await
            .unwrap();

        let partial = EmbeddingGenerationService::new(
            store.clone(),
            Arc::new(FailingEmbeddingGenerator::new(32, "Hummus")),
            policy(),
        );
        let summary = partial.generate(GenerationPolicy::Regenerate).await.unwrap();

        assert_eq!(summary.embedded, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(store.count_embeddings().await.unwrap(), 2);
        for embedding in store.list_embeddings().await.unwrap() {
            assert_eq!(embedding.dimension(), 32);
        }
    }

    #[tokio::test]
    async fn test_overview_changes_embedded_text() {
        let store = seeded_store(&["Curry"]).await;
        let generator = Arc::new(HashingEmbeddingGenerator::new(64));

        let plain = EmbeddingGenerationService::new(store.clone(), generator.clone(), policy());
        plain.generate(GenerationPolicy::SkipExisting).await.unwrap();
        let before = store.list_embeddings().await.unwrap()[0].vector.clone();

        let enriched = EmbeddingGenerationService::new(store.clone(), generator, policy())
            .with_overview(Arc::new(StaticOverviewGenerator::new("Pairs well with naan and rice.")));
        enriched.generate(GenerationPolicy::Regenerate).await.unwrap();
        let after = store.list_embeddings().await.unwrap()[0].vector.clone();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_failing_overview_degrades_to_plain_text() {
        let store = seeded_store(&["Curry"]).await;
        let service = EmbeddingGenerationService::new(
            store.clone(),
            Arc::new(HashingEmbeddingGenerator::new(64)),
            policy(),
        )
        .with_overview(Arc::new(StaticOverviewGenerator::failing()));

        let summary = service.generate(GenerationPolicy::SkipExisting).await.unwrap();
        assert_eq!(summary.embedded, 1);
    }

    #[tokio::test]
    async fn test_empty_store_is_a_no_op() {
        let store = Arc::new(MemoryRecipeStore::new());
        let service = EmbeddingGenerationService::new(store, Arc::new(HashingEmbeddingGenerator::new(8)), policy());
        let summary = service.generate(GenerationPolicy::SkipExisting).await.unwrap();
        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.embedded, 0);
    }
}
