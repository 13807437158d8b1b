//! Error types for the recipe knowledge base

use std::time::Duration;
use thiserror::Error;

/// Base error type for pipeline operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Entity not found: type={entity_type} id={id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Embedding generation error: {0}")]
    EmbeddingError(String),

    #[error("Model response error: {0}")]
    ModelResponseError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("No recipes could be ingested from any feed")]
    NoRecipesIngested,

    #[error("No embeddings could be generated for {candidates} candidate recipes")]
    NoEmbeddingsGenerated { candidates: usize },

    #[error("Internal system error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Helper to create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

/// Error type for the relational store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    #[error("Query execution error: {0}")]
    QueryError(String),
    #[error("Data mapping error from row: {0}")]
    MappingError(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() || db_err.is_unique_violation() => {
                StoreError::ConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
                StoreError::MappingError(error.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionError(error.to_string())
            }
            _ => StoreError::QueryError(error.to_string()),
        }
    }
}

/// Error type for recipe feeds (external sources).
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed '{feed}' unreachable: {message}")]
    Unreachable { feed: String, message: String },
    #[error("Feed '{feed}' timed out after {after:?}")]
    Timeout { feed: String, after: Duration },
    #[error("Feed '{feed}' returned a malformed payload: {message}")]
    MalformedPayload { feed: String, message: String },
    #[error("Feed '{feed}' I/O error: {source}")]
    Io {
        feed: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_display() {
        let error = CoreError::ValidationError("k must be positive".into());
        assert_eq!(format!("{}", error), "Invalid input: k must be positive");
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::DimensionMismatch { expected: 384, actual: 3 };
        assert_eq!(
            format!("{}", error),
            "Embedding dimension mismatch: expected 384, got 3"
        );
    }

    #[test]
    fn test_feed_error_converts_into_core_error() {
        let error = FeedError::Unreachable {
            feed: "epicurious".into(),
            message: "connection refused".into(),
        };
        let core: CoreError = error.into();
        assert!(matches!(core, CoreError::Feed(FeedError::Unreachable { ref feed, .. }) if feed == "epicurious"));
        assert_eq!(
            core.to_string(),
            "Feed error: Feed 'epicurious' unreachable: connection refused"
        );
    }

    #[test]
    fn test_not_found_error() {
        let error = CoreError::not_found("Recipe", 99);
        match error {
            CoreError::NotFound { entity_type, id } => {
                assert_eq!(entity_type, "Recipe");
                assert_eq!(id, "99");
            }
            _ => panic!("Expected NotFound"),
        }
    }
}
