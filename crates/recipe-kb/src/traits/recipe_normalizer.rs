//! RecipeNormalizer trait definition for mapping provider records onto the recipe schema

use async_trait::async_trait;

use crate::data::{CoreError, NewRecipe};
use crate::traits::RawRecipe;

/// Translates a provider-specific record into a `NewRecipe`.
#[async_trait]
pub trait RecipeNormalizer: Send + Sync {
    /// Contract: the returned recipe passes `NewRecipe::validate`; records that cannot be
    /// mapped return `CoreError::ValidationError` or `CoreError::ModelResponseError`.
    async fn normalize(&self, feed: &str, raw: &RawRecipe) -> Result<NewRecipe, CoreError>;
}
