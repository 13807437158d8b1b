//! SQLite implementation of `RecipeStore` using sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::data::{ContentHash, Embedding, NewRecipe, Recipe, RecipeId, StoreError};
use crate::storage::migrations::run_migrations;
use crate::traits::{InsertOutcome, RecipeStore};

const RECIPE_COLUMNS: &str = "id, name, ingredients, instructions, description, cuisine_type, \
     prep_time, cook_time, total_time, servings, source, source_ref, content_hash, created_at";

/// Recipe store backed by a SQLite database file.
#[derive(Clone)]
pub struct SqliteRecipeStore {
    pool: SqlitePool,
}

impl SqliteRecipeStore {
    /// Opens (creating if missing) the database at `database_url` with foreign keys enforced.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::ConnectionError(format!("Invalid database URL '{}': {}", database_url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(format!("Failed to connect to database: {}", e)))?;

        info!(database_url, "Connected to recipe database");
        Ok(Self { pool })
    }

    fn row_to_recipe(row: &SqliteRow) -> Result<Recipe, StoreError> {
        Ok(Recipe {
            id: RecipeId(row.try_get("id")?),
            name: row.try_get("name")?,
            ingredients: decode_json_list(row.try_get("ingredients")?, "ingredients")?,
            instructions: decode_json_list(row.try_get("instructions")?, "instructions")?,
            description: row.try_get("description")?,
            cuisine_type: row.try_get("cuisine_type")?,
            prep_time: to_u32(row.try_get("prep_time")?, "prep_time")?,
            cook_time: to_u32(row.try_get("cook_time")?, "cook_time")?,
            total_time: to_u32(row.try_get("total_time")?, "total_time")?,
            servings: to_u32(row.try_get("servings")?, "servings")?,
            source: row.try_get("source")?,
            source_ref: row.try_get("source_ref")?,
            content_hash: ContentHash(row.try_get("content_hash")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_embedding(row: &SqliteRow) -> Result<Embedding, StoreError> {
        let raw: String = row.try_get("embedding_vector")?;
        let vector: Vec<f32> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::MappingError(format!("embedding_vector: {}", e)))?;
        let dimension: i64 = row.try_get("dimension")?;
        if dimension as usize != vector.len() {
            return Err(StoreError::MappingError(format!(
                "stored dimension {} does not match vector length {}",
                dimension,
                vector.len()
            )));
        }
        Ok(Embedding {
            recipe_id: RecipeId(row.try_get("recipe_id")?),
            vector,
            model: row.try_get("model")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn fetch_recipes(&self, sql: &str) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_recipe).collect()
    }
}

fn decode_json_list(raw: String, column: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(&raw).map_err(|e| StoreError::MappingError(format!("{}: {}", column, e)))
}

fn encode_json<T: serde::Serialize + ?Sized>(value: &T, column: &str) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::MappingError(format!("{}: {}", column, e)))
}

fn to_u32(value: Option<i64>, column: &str) -> Result<Option<u32>, StoreError> {
    value
        .map(|v| u32::try_from(v).map_err(|_| StoreError::MappingError(format!("{} out of range: {}", column, v))))
        .transpose()
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        let applied = run_migrations(&self.pool).await?;
        debug!(applied, "Schema ready");
        Ok(())
    }

    #[instrument(skip(self, recipe), fields(name = %recipe.name))]
    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<InsertOutcome, StoreError> {
        let hash = recipe.content_hash();

        let result = sqlx::query(
            "INSERT INTO recipes (name, ingredients, instructions, description, cuisine_type, \
             prep_time, cook_time, total_time, servings, source, source_ref, content_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(content_hash) DO NOTHING",
        )
        .bind(&recipe.name)
        .bind(encode_json(&recipe.ingredients, "ingredients")?)
        .bind(encode_json(&recipe.instructions, "instructions")?)
        .bind(&recipe.description)
        .bind(&recipe.cuisine_type)
        .bind(recipe.prep_time.map(i64::from))
        .bind(recipe.cook_time.map(i64::from))
        .bind(recipe.total_time.map(i64::from))
        .bind(recipe.servings.map(i64::from))
        .bind(&recipe.source)
        .bind(&recipe.source_ref)
        .bind(&hash.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Inserted(RecipeId(result.last_insert_rowid())));
        }

        let existing: i64 = sqlx::query("SELECT id FROM recipes WHERE content_hash = ?")
            .bind(&hash.0)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")?;
        Ok(InsertOutcome::Duplicate(RecipeId(existing)))
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let sql = format!("SELECT {} FROM recipes WHERE id = ?", RECIPE_COLUMNS);
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_recipe).transpose()
    }

    async fn get_recipes(&self, ids: &[RecipeId]) -> Result<Vec<Recipe>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM recipes WHERE id IN ({}) ORDER BY id",
            RECIPE_COLUMNS, placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.0);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_recipe).collect()
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        self.fetch_recipes(&format!("SELECT {} FROM recipes ORDER BY id", RECIPE_COLUMNS))
            .await
    }

    async fn recipes_without_embeddings(&self) -> Result<Vec<Recipe>, StoreError> {
        let columns = RECIPE_COLUMNS
            .split(", ")
            .map(|c| format!("r.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        self.fetch_recipes(&format!(
            "SELECT {} FROM recipes r \
             LEFT JOIN recipe_embeddings e ON e.recipe_id = r.id \
             WHERE e.recipe_id IS NULL ORDER BY r.id",
            columns
        ))
        .await
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_recipes(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM recipes")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count as usize)
    }

    #[instrument(skip(self, embedding), fields(recipe_id = %embedding.recipe_id, dimension = embedding.dimension()))]
    async fn upsert_embedding(&self, embedding: &Embedding) -> Result<(), StoreError> {
        let existing: Option<i64> = sqlx::query(
            "SELECT dimension FROM recipe_embeddings WHERE recipe_id != ? LIMIT 1",
        )
        .bind(embedding.recipe_id.0)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| row.try_get("dimension"))
        .transpose()?;

        if let Some(expected) = existing {
            if expected as usize != embedding.dimension() {
                return Err(StoreError::DimensionMismatch {
                    expected: expected as usize,
                    actual: embedding.dimension(),
                });
            }
        }

        sqlx::query(
            "INSERT INTO recipe_embeddings (recipe_id, embedding_vector, dimension, model, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(recipe_id) DO UPDATE SET \
                embedding_vector = excluded.embedding_vector, \
                dimension = excluded.dimension, \
                model = excluded.model, \
                created_at = excluded.created_at",
        )
        .bind(embedding.recipe_id.0)
        .bind(encode_json(&embedding.vector, "embedding_vector")?)
        .bind(embedding.dimension() as i64)
        .bind(&embedding.model)
        .bind(embedding.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_embedding(&self, recipe_id: RecipeId) -> Result<Option<Embedding>, StoreError> {
        let row = sqlx::query(
            "SELECT recipe_id, embedding_vector, dimension, model, created_at \
             FROM recipe_embeddings WHERE recipe_id = ?",
        )
        .bind(recipe_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_embedding).transpose()
    }

    async fn list_embeddings(&self) -> Result<Vec<Embedding>, StoreError> {
        let rows = sqlx::query(
            "SELECT recipe_id, embedding_vector, dimension, model, created_at \
             FROM recipe_embeddings ORDER BY recipe_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_embedding).collect()
    }

    async fn count_embeddings(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM recipe_embeddings")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count as usize)
    }

    async fn embedding_dimension(&self) -> Result<Option<usize>, StoreError> {
        let dimension: Option<i64> = sqlx::query("SELECT dimension FROM recipe_embeddings LIMIT 1")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("dimension"))
            .transpose()?;
        Ok(dimension.map(|d| d as usize))
    }

    async fn clear_embeddings(&self) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM recipe_embeddings")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
