//! Core data structures for the recipe knowledge base

pub mod entities;
pub mod errors;
pub mod identifiers;
pub mod outcome;

// Re-export all common types
pub use entities::{Embedding, NewRecipe, RankedRecipe, Recipe};
pub use errors::{CoreError, FeedError, StoreError};
pub use identifiers::{ContentHash, RecipeId};
pub use outcome::{FeedReport, GenerationSummary, IngestionSummary, ItemOutcome, SkipReason};
