//! EmbeddingGenerator trait definition for vector embeddings

use async_trait::async_trait;
use crate::data::errors::CoreError;

/// Represents the interface for generating vector embeddings from text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Generates an embedding vector for the given text.
    ///
    /// Contract: the returned vector has exactly `dimension()` elements.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError>;

    /// Fixed length of every vector this generator produces.
    fn dimension(&self) -> usize;

    /// Identifier recorded alongside each stored vector.
    fn model_id(&self) -> String;
}
