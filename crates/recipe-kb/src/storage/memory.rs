//! In-memory `RecipeStore` with the same constraints as the SQLite schema

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;
use chrono::Utc;

use crate::data::{ContentHash, Embedding, NewRecipe, Recipe, RecipeId, StoreError};
use crate::traits::{InsertOutcome, RecipeStore};

#[derive(Default)]
struct Tables {
    recipes: BTreeMap<RecipeId, Recipe>,
    by_hash: HashMap<ContentHash, RecipeId>,
    embeddings: BTreeMap<RecipeId, Embedding>,
    last_id: i64,
}

/// In-memory recipe store with the same constraints as the SQLite store
#[derive(Clone, Default)]
pub struct MemoryRecipeStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertOutcome, StoreError> {
        let hash = recipe.content_hash();
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.by_hash.get(&hash) {
            return Ok(InsertOutcome::Duplicate(*existing));
        }

        // AUTOINCREMENT never reuses ids
        tables.last_id += 1;
        let id = RecipeId(tables.last_id);
        tables.by_hash.insert(hash, id);
        tables.recipes.insert(id, Recipe::from_new(id, recipe.clone(), Utc::now()));
        Ok(InsertOutcome::Inserted(id))
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.recipes.get(&id).cloned())
    }

    async fn get_recipes(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.recipes.values().cloned().collect())
    }

    async fn recipes_without_embeddings(&self) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .filter(|r| !tables.embeddings.contains_key(&r.id))
            .cloned()
            .collect())
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.recipes.remove(&id) {
            Some(recipe) => {
                tables.by_hash.remove(&recipe.content_hash);
                tables.embeddings.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_recipes(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.recipes.len())
    }

    async fn upsert_embedding(&self, embedding: &Embedding) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.recipes.contains_key(&embedding.recipe_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "recipe {} does not exist",
                embedding.recipe_id
            )));
        }

        if let Some(other) = tables
            .embeddings
            .values()
            .find(|e| e.recipe_id != embedding.recipe_id)
        {
            if other.dimension() != embedding.dimension() {
                return Err(StoreError::DimensionMismatch {
                    expected: other.dimension(),
                    actual: embedding.dimension(),
                });
            }
        }

        tables.embeddings.insert(embedding.recipe_id, embedding.clone());
        Ok(())
    }

    async fn get_embedding(&self, recipe_id: RecipeId) -> Result<Option<Embedding>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.embeddings.get(&recipe_id).cloned())
    }

    async fn list_embeddings(&self) -> Result<Vec<Embedding>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.embeddings.values().cloned().collect())
    }

    async fn count_embeddings(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.embeddings.len())
    }

    async fn embedding_dimension(&self) -> Result<Option<usize>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.embeddings.values().next().map(Embedding::dimension))
    }

    async fn clear_embeddings(&self) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables.embeddings.len();
        tables.embeddings.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::sample_recipe;

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryRecipeStore::new();
        let first = store.insert_recipe(&sample_recipe("Dal")).await.unwrap().id();
        store.delete_recipe(first).await.unwrap();
        let second = store.insert_recipe(&sample_recipe("Dal")).await.unwrap();
        assert_eq!(second, InsertOutcome::Inserted(RecipeId(first.0 + 1)));
    }

    #[tokio::test]
    async fn test_embedding_constraints_match_sqlite() {
        let store = MemoryRecipeStore::new();
        let a = store.insert_recipe(&sample_recipe("Pho")).await.unwrap().id();
        let b = store.insert_recipe(&sample_recipe("Banh Mi")).await.unwrap().id();

        assert!(matches!(
            store.upsert_embedding(&Embedding::new(RecipeId(77), vec![1.0], "t")).await,
            Err(StoreError::ConstraintViolation(_))
        ));

        store.upsert_embedding(&Embedding::new(a, vec![1.0, 2.0], "t")).await.unwrap();
        assert!(matches!(
            store.upsert_embedding(&Embedding::new(b, vec![1.0], "t")).await,
            Err(StoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));

        // The only row may change dimension when overwritten
        store.upsert_embedding(&Embedding::new(a, vec![1.0, 2.0, 3.0], "t")).await.unwrap();
        assert_eq!(store.embedding_dimension().await.unwrap(), Some(3));
    }
}
