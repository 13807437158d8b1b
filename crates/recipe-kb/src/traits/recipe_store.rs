//! RecipeStore trait definition for relational storage of recipes and their embeddings

use async_trait::async_trait;

use crate::data::{Embedding, NewRecipe, Recipe, RecipeId, StoreError};

/// Result of inserting a recipe under the content-hash deduplication policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id.
    Inserted(RecipeId),
    /// A recipe with the same content hash already exists under this id.
    Duplicate(RecipeId),
}

impl InsertOutcome {
    pub fn id(&self) -> RecipeId {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::Duplicate(id) => *id,
        }
    }
}

/// Represents the interface to the relational store holding recipes and embeddings.
///
/// Only the ingestor writes recipe rows and only the generator writes embedding rows;
/// every write is a single atomic statement.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Creates the schema if it is missing. Safe to call on every start.
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// Inserts a recipe, assigning its id, unless one with the same content hash exists.
    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertOutcome, StoreError>;

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Fetches the recipes for `ids`, in ascending id order. Unknown ids are ignored.
    async fn get_recipes(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, StoreError>;

    /// All recipes in ascending id order.
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Recipes that have no embedding row yet, in ascending id order.
    async fn recipes_without_embeddings(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Deletes a recipe and, through referential integrity, its embedding.
    /// Returns whether a row was removed.
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError>;

    async fn count_recipes(&self) -> Result<usize, StoreError>;

    /// Inserts or overwrites the embedding for `embedding.recipe_id`.
    ///
    /// Contract: the recipe must exist (`ConstraintViolation` otherwise) and the vector
    /// length must equal the dimension of every other stored embedding
    /// (`DimensionMismatch` otherwise).
    async fn upsert_embedding(&self, embedding: &Embedding) -> Result<(), StoreError>;

    async fn get_embedding(&self, recipe_id: RecipeId) -> Result<Option<Embedding>, StoreError>;

    /// All embeddings in ascending recipe id order.
    async fn list_embeddings(&self) -> Result<Vec<Embedding>, StoreError>;

    async fn count_embeddings(&self) -> Result<usize, StoreError>;

    /// Dimension shared by stored embeddings, `None` when there are none.
    async fn embedding_dimension(&self) -> Result<Option<usize>, StoreError>;

    /// Removes every embedding row, used before regenerating with a different model.
    async fn clear_embeddings(&self) -> Result<usize, StoreError>;
}
