//! Relational storage for recipes and their embeddings

pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use crate::data::StoreError;
use crate::traits::RecipeStore;

pub use memory::MemoryRecipeStore;
pub use sqlite::SqliteRecipeStore;

/// URL that selects the in-memory store instead of SQLite.
pub const MEMORY_STORE_URL: &str = "memory://local";

/// Opens the store named by `database_url` and makes sure its schema exists.
///
/// `memory://...` selects `MemoryRecipeStore`, `sqlite:...` selects SQLite
/// (`sqlite://recipes.db`, `sqlite::memory:`).
pub async fn open_store(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<Arc<dyn RecipeStore>, StoreError> {
    let store: Arc<dyn RecipeStore> = if database_url.starts_with("memory://") {
        Arc::new(MemoryRecipeStore::new())
    } else if database_url.starts_with("sqlite:") {
        Arc::new(SqliteRecipeStore::connect(database_url, max_connections, acquire_timeout).await?)
    } else {
        return Err(StoreError::ConnectionError(format!(
            "Unsupported database URL: {}",
            database_url
        )));
    };
    store.init_schema().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::sample_recipe;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(MEMORY_STORE_URL, 1, Duration::from_secs(1)).await.unwrap();
        store.insert_recipe(&sample_recipe("Kimchi Stew")).await.unwrap();
        assert_eq!(store.count_recipes().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_scheme() {
        let result = open_store("postgres://localhost/recipes", 1, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(StoreError::ConnectionError(_))));
    }
}
