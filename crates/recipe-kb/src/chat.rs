//! Chat-model access shared by the LLM normalizer and overview enrichment

use serde::de::DeserializeOwned;

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
#[cfg(feature = "openai")]
use tracing::debug;

#[cfg(feature = "openai")]
use crate::config::LlmConfig;
use crate::data::CoreError;

/// Removes a Markdown code fence wrapped around a model reply (```` ```json ... ``` ````).
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline
    let body = match rest.find('\n') {
        Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[newline + 1..],
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses a model reply as JSON after stripping code fences.
pub fn parse_json_reply<T: DeserializeOwned>(content: &str) -> Result<T, CoreError> {
    serde_json::from_str(strip_code_fences(content)).map_err(|e| {
        CoreError::ModelResponseError(format!("reply is not the expected JSON ({}): {}", e, truncate(content, 200)))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[cfg(feature = "openai")]
#[derive(Clone)]
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

#[cfg(feature = "openai")]
impl OpenAIChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, CoreError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::ConfigError("chat model requires an API key".into()))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.base_url.trim_end_matches('/'));
        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` as a single user message and returns the reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String, CoreError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CoreError::ModelResponseError(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CoreError::ModelResponseError("reply has no content".into()))?;

        debug!(model = %self.model, chars = content.len(), "Chat completion received");
        Ok(content)
    }

    pub async fn complete_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, CoreError> {
        let content = self.complete(prompt).await?;
        parse_json_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_json_reply_reports_model_error() {
        let value: Value = parse_json_reply("```JSON\n{\"overview\": \"Hearty.\"}\n```").unwrap();
        assert_eq!(value["overview"], "Hearty.");

        let result: Result<Value, _> = parse_json_reply("Sure! Here is your recipe.");
        assert!(matches!(result, Err(CoreError::ModelResponseError(_))));
    }
}
