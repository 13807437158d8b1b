//! Embedding model adapters and recipe text rendering

mod hashing;
#[cfg(feature = "openai")]
mod openai;
pub mod text;

use std::sync::Arc;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::data::CoreError;
use crate::traits::EmbeddingGenerator;

pub use hashing::{HashingEmbeddingGenerator, DEFAULT_HASHING_DIMENSION};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingService;
pub use text::{format_recipe_text, has_embeddable_content};

/// Creates the embedding generator selected by `config`.
pub fn create_embedding_generator(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingGenerator>, CoreError> {
    match config.provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbeddingGenerator::new(
            config.effective_dimension(),
        ))),
        #[cfg(feature = "openai")]
        EmbeddingProvider::OpenAi => Ok(Arc::new(OpenAIEmbeddingService::new(config)?)),
        #[cfg(not(feature = "openai"))]
        EmbeddingProvider::OpenAi => Err(CoreError::ConfigError(
            "embedding provider 'openai' requires the 'openai' feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_defaults_to_hashing() {
        let generator = create_embedding_generator(&EmbeddingConfig::default()).unwrap();
        assert_eq!(generator.dimension(), 384);
        assert_eq!(generator.model_id(), "hashing-384");
    }
}
