//! OverviewGenerator trait definition for recipe enrichment

use async_trait::async_trait;

use crate::data::{CoreError, Recipe};

/// Produces a short prose overview of a recipe (pairings, dietary notes, effort, flavor)
/// that is appended to the text being embedded.
#[async_trait]
pub trait OverviewGenerator: Send + Sync {
    async fn generate_overview(&self, recipe: &Recipe) -> Result<String, CoreError>;
}
