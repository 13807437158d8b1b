//! Normalizers mapping provider records onto the recipe schema

pub mod field_mapping;
#[cfg(feature = "openai")]
pub mod llm;

use std::sync::Arc;

use crate::config::{NormalizerKind, PipelineConfig};
use crate::data::CoreError;
use crate::traits::RecipeNormalizer;

pub use field_mapping::{parse_duration, FieldMappingNormalizer};
#[cfg(feature = "openai")]
pub use llm::LlmNormalizer;

/// Builds the normalizer selected in `config`.
pub fn create_normalizer(config: &PipelineConfig) -> Result<Arc<dyn RecipeNormalizer>, CoreError> {
    match config.normalizer {
        NormalizerKind::FieldMapping => Ok(Arc::new(FieldMappingNormalizer::new())),
        #[cfg(feature = "openai")]
        NormalizerKind::Llm => {
            let model = crate::chat::OpenAIChatModel::new(&config.llm)?;
            Ok(Arc::new(LlmNormalizer::new(model, (&config.retry).into())))
        }
        #[cfg(not(feature = "openai"))]
        NormalizerKind::Llm => Err(CoreError::ConfigError(
            "normalizer 'llm' requires the 'openai' feature".into(),
        )),
    }
}
