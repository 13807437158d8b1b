//! Top-K similarity queries over stored recipe embeddings

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::data::{CoreError, RankedRecipe, RecipeId};
use crate::retry::{with_retry, RetryPolicy};
use crate::similarity::{rank_top_k, SimilarityMetric};
use crate::traits::{EmbeddingGenerator, RecipeStore};

/// What to search for.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// Free text, embedded with the configured generator.
    Text(String),
    /// A stored recipe, compared through its stored vector. The recipe itself is left
    /// out of the results.
    Recipe(RecipeId),
}

impl fmt::Display for QueryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryInput::Text(text) => write!(f, "text {:?}", text),
            QueryInput::Recipe(id) => write!(f, "recipe {}", id),
        }
    }
}

/// Read-only verifier returning the recipes nearest to a query.
pub struct QueryService {
    store: Arc<dyn RecipeStore>,
    generator: Arc<dyn EmbeddingGenerator>,
    metric: SimilarityMetric,
    retry: RetryPolicy,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        generator: Arc<dyn EmbeddingGenerator>,
        metric: SimilarityMetric,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            metric,
            retry,
        }
    }

    /// Returns up to `k` recipes, most similar first, ties broken by ascending id.
    ///
    /// An empty embedding table yields an empty result. Invalid input, an unknown recipe,
    /// a recipe without an embedding and dimension mismatches are errors.
    #[instrument(skip(self), fields(metric = %self.metric))]
    pub async fn query(&self, input: &QueryInput, k: usize) -> Result<Vec<RankedRecipe>, CoreError> {
        if k == 0 {
            return Err(CoreError::ValidationError("k must be positive".into()));
        }
        if let QueryInput::Text(text) = input {
            if text.trim().is_empty() {
                return Err(CoreError::ValidationError("query text is empty".into()));
            }
        }
        if let QueryInput::Recipe(id) = input {
            if self.store.get_recipe(*id).await?.is_none() {
                return Err(CoreError::not_found("Recipe", id));
            }
        }

        let embeddings = self.store.list_embeddings().await?;
        if embeddings.is_empty() {
            info!("No embeddings stored, nothing to rank");
            return Ok(Vec::new());
        }

        let (query_vector, exclude) = match input {
            QueryInput::Text(text) => {
                if let Some(stored) = embeddings.iter().find(|e| e.model != self.generator.model_id()) {
                    warn!(
                        stored_model = %stored.model,
                        query_model = %self.generator.model_id(),
                        "Query model differs from the model of stored embeddings"
                    );
                }
                let vector = with_retry(&self.retry, "embed query", || {
                    self.generator.generate_embedding(text)
                })
                .await?;
                (vector, None)
            }
            QueryInput::Recipe(id) => {
                let stored = embeddings
                    .iter()
                    .find(|e| e.recipe_id == *id)
                    .ok_or_else(|| CoreError::QueryError(format!("recipe {} has no embedding", id)))?;
                (stored.vector.clone(), Some(*id))
            }
        };

        let candidates = embeddings.iter().filter(|e| Some(e.recipe_id) != exclude);
        let ranked = rank_top_k(&query_vector, candidates, k, self.metric)?;

        let ids: Vec<RecipeId> = ranked.iter().map(|(id, _)| *id).collect();
        let mut recipes: HashMap<RecipeId, _> = self
            .store
            .get_recipes(&ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let results: Vec<RankedRecipe> = ranked
            .into_iter()
            .filter_map(|(id, score)| recipes.remove(&id).map(|recipe| RankedRecipe { recipe, score }))
            .collect();

        debug!(query = %input, k, returned = results.len(), "Query answered");
        Ok(results)
    }
}
