#[cfg(feature = "openai")]
use async_openai::{
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client, config::OpenAIConfig,
};
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::data::CoreError;
use crate::traits::EmbeddingGenerator;

/// Embeddings from an OpenAI-compatible endpoint (Gemini's by default).
#[cfg(feature = "openai")]
pub struct OpenAIEmbeddingService {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

#[cfg(feature = "openai")]
impl OpenAIEmbeddingService {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, CoreError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::ConfigError("embedding provider requires an API key".into()))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.base_url.trim_end_matches('/'));
        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            dimension: config.effective_dimension(),
        })
    }
}

#[cfg(feature = "openai")]
#[async_trait]
impl EmbeddingGenerator for OpenAIEmbeddingService {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| CoreError::EmbeddingError(e.to_string()))?;

        let response = self.client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| CoreError::EmbeddingError(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| CoreError::EmbeddingError("response contained no embedding".into()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: EmbeddingProvider::OpenAi,
            api_key: Some("test-key".into()),
            base_url: format!("{}/", server.uri()),
            dimension: Some(3),
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "model": "text-embedding-004",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
                "usage": {"prompt_tokens": 4, "total_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = OpenAIEmbeddingService::new(&config(&server)).unwrap();
        let vector = service.generate_embedding("Recipe: Toast").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(service.dimension(), 3);
        assert_eq!(service.model_id(), "text-embedding-004");
    }

    #[tokio::test]
    async fn test_api_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "bad input", "type": "invalid_request_error", "param": null, "code": null}
            })))
            .mount(&server)
            .await;

        let service = OpenAIEmbeddingService::new(&config(&server)).unwrap();
        let result = service.generate_embedding("Recipe: Toast").await;
        assert!(matches!(result, Err(CoreError::EmbeddingError(_))));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = OpenAIEmbeddingService::new(&EmbeddingConfig::default());
        assert!(matches!(result, Err(CoreError::ConfigError(_))));
    }
}
