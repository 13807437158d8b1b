//! Core traits (interfaces) between the pipeline stages and their collaborators

pub mod recipe_store;
pub mod recipe_feed;
mod recipe_normalizer;
mod embedding_generator;
mod overview_generator;

pub use recipe_store::{InsertOutcome, RecipeStore};
pub use recipe_feed::{RawRecipe, RecipeFeed};
pub use recipe_normalizer::RecipeNormalizer;
pub use embedding_generator::EmbeddingGenerator;
#[cfg(test)]
pub use embedding_generator::MockEmbeddingGenerator;
pub use overview_generator::OverviewGenerator;
