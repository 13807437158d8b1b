//! Schema steps for the SQLite recipe store
//!
//! Each step is applied once, in order, and recorded in `schema_migrations`.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::data::StoreError;

/// Ordered `(version, sql)` schema steps.
pub fn generate_migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "20250601000000_initial_schema",
            r#"
            CREATE TABLE IF NOT EXISTS recipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                ingredients TEXT NOT NULL,
                instructions TEXT NOT NULL,
                description TEXT,
                cuisine_type TEXT,
                prep_time INTEGER CHECK (prep_time IS NULL OR prep_time >= 0),
                cook_time INTEGER CHECK (cook_time IS NULL OR cook_time >= 0),
                total_time INTEGER CHECK (total_time IS NULL OR total_time >= 0),
                servings INTEGER CHECK (servings IS NULL OR servings > 0),
                source TEXT,
                source_ref TEXT,
                content_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recipe_embeddings (
                recipe_id INTEGER PRIMARY KEY,
                embedding_vector TEXT NOT NULL,
                dimension INTEGER NOT NULL CHECK (dimension > 0),
                model TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
            );
            "#,
        ),
        (
            "20250602000000_lookup_indexes",
            r#"
            CREATE INDEX IF NOT EXISTS idx_recipes_source ON recipes(source);

            CREATE INDEX IF NOT EXISTS idx_recipe_embeddings_model ON recipe_embeddings(model);
            "#,
        ),
    ]
}

/// Applies every step not yet recorded in `schema_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> = sqlx::query("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.try_get::<String, _>("version"))
        .collect::<Result<_, _>>()?;

    let mut count = 0;
    for (version, sql) in generate_migrations() {
        if applied.iter().any(|v| v == version) {
            debug!(version, "Migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::MigrationError(format!("{}: {}", version, e)))?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(version, "Applied migration");
        count += 1;
    }

    Ok(count)
}
