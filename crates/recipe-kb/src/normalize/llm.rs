//! Chat-model driven normalization for records with no recognizable layout

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::chat::OpenAIChatModel;
use crate::data::{CoreError, NewRecipe};
use crate::normalize::FieldMappingNormalizer;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::{RawRecipe, RecipeNormalizer};

/// Asks a chat model to rewrite a provider record into the recipe schema, then checks
/// the reply with the same rules as `FieldMappingNormalizer`.
pub struct LlmNormalizer {
    model: OpenAIChatModel,
    retry: RetryPolicy,
    fields: FieldMappingNormalizer,
}

impl LlmNormalizer {
    pub fn new(model: OpenAIChatModel, retry: RetryPolicy) -> Self {
        Self {
            model,
            retry,
            fields: FieldMappingNormalizer::new(),
        }
    }
}

pub(crate) fn transformation_prompt(feed: &str, payload: &Value) -> String {
    let record = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    format!(
        r#"Transform this recipe data into the specified schema:

Input Recipe:
{record}

Please transform this into a JSON object with the following fields:
- name (from title)
- ingredients (as array of strings)
- instructions (as array of strings)
- description (synthesized from instructions)
- cuisine_type (inferred from name and ingredients)
- prep_time (estimated in minutes, integer)
- cook_time (estimated in minutes, integer)
- total_time (prep_time + cook_time)
- servings (estimated, positive integer)
- source (keep the input's source if present, otherwise "{feed}")

Output the result as a JSON object only, no other text."#
    )
}

#[async_trait]
impl RecipeNormalizer for LlmNormalizer {
    async fn normalize(&self, feed: &str, raw: &RawRecipe) -> Result<NewRecipe, CoreError> {
        let prompt = transformation_prompt(feed, &raw.payload);
        let transformed: Value = with_retry(&self.retry, "normalize recipe", || {
            self.model.complete_json(&prompt)
        })
        .await?;

        debug!(feed, key = %raw.key, model = self.model.model(), "Record transformed by model");
        self.fields.map_value(feed, &raw.key, &transformed)
    }
}
