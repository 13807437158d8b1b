//! LLM-written recipe overviews appended to the embedded text

use std::sync::Arc;

#[cfg(feature = "openai")]
use async_trait::async_trait;
#[cfg(feature = "openai")]
use serde::Deserialize;

#[cfg(feature = "openai")]
use crate::chat::OpenAIChatModel;
use crate::config::PipelineConfig;
use crate::data::{CoreError, Recipe};
#[cfg(feature = "openai")]
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::OverviewGenerator;

fn minutes(value: Option<u32>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

pub(crate) fn overview_prompt(recipe: &Recipe) -> String {
    let ingredients = serde_json::to_string_pretty(&recipe.ingredients).unwrap_or_default();
    let instructions = serde_json::to_string_pretty(&recipe.instructions).unwrap_or_default();
    format!(
        r#"Your task is to generate a comprehensive "Overview" section for a recipe. The overview should be a concise, engaging paragraph (or a few closely related paragraphs) that highlights key aspects of the dish, making it easy for a user to understand its suitability and appeal.

Recipe Information:
Name: {name}
Description: {description}
Cuisine Type: {cuisine}
Ingredients: {ingredients}
Instructions: {instructions}
Prep Time: {prep} minutes
Cook Time: {cook} minutes
Total Time: {total} minutes
Servings: {servings}

Please generate an overview that includes:
- Pairings/Serving Suggestions
- Dietary Information/Restrictions
- Ease of Cooking
- Time Commitment
- Versatility/Customization
- Flavor Profile/Texture

Output the result as a JSON object with a single "overview" field containing the text."#,
        name = recipe.name,
        description = recipe.description.as_deref().unwrap_or(""),
        cuisine = recipe.cuisine_type.as_deref().unwrap_or(""),
        prep = minutes(recipe.prep_time),
        cook = minutes(recipe.cook_time),
        total = minutes(recipe.total_time),
        servings = minutes(recipe.servings),
    )
}

#[cfg(feature = "openai")]
#[derive(Deserialize)]
struct OverviewReply {
    overview: String,
}

/// Overview generator backed by an OpenAI-compatible chat model.
#[cfg(feature = "openai")]
pub struct LlmOverviewGenerator {
    model: OpenAIChatModel,
    retry: RetryPolicy,
}

#[cfg(feature = "openai")]
impl LlmOverviewGenerator {
    pub fn new(model: OpenAIChatModel, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }
}

#[cfg(feature = "openai")]
#[async_trait]
impl OverviewGenerator for LlmOverviewGenerator {
    async fn generate_overview(&self, recipe: &Recipe) -> Result<String, CoreError> {
        let prompt = overview_prompt(recipe);
        let reply: OverviewReply = with_retry(&self.retry, "generate overview", || {
            self.model.complete_json(&prompt)
        })
        .await?;

        let overview = reply.overview.trim().to_string();
        if overview.is_empty() {
            return Err(CoreError::ModelResponseError("overview is empty".into()));
        }
        Ok(overview)
    }
}

/// Builds the overview generator when enrichment is enabled in `config`.
pub fn create_overview_generator(
    config: &PipelineConfig,
) -> Result<Option<Arc<dyn OverviewGenerator>>, CoreError> {
    if !config.enrichment.enabled {
        return Ok(None);
    }
    build_llm_generator(config).map(Some)
}

#[cfg(feature = "openai")]
fn build_llm_generator(config: &PipelineConfig) -> Result<Arc<dyn OverviewGenerator>, CoreError> {
    let model = OpenAIChatModel::new(&config.llm)?;
    Ok(Arc::new(LlmOverviewGenerator::new(model, (&config.retry).into())))
}

#[cfg(not(feature = "openai"))]
fn build_llm_generator(_config: &PipelineConfig) -> Result<Arc<dyn OverviewGenerator>, CoreError> {
    Err(CoreError::ConfigError(
        "overview enrichment requires the 'openai' feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RecipeId;
    use crate::test_utils::fixtures::sample_recipe;
    use chrono::Utc;

    fn recipe() -> Recipe {
        Recipe::from_new(RecipeId(5), sample_recipe("Bibimbap"), Utc::now())
    }

    #[test]
    fn test_disabled_enrichment_builds_nothing() {
        let config = PipelineConfig::default();
        assert!(create_overview_generator(&config).unwrap().is_none());
    }

    #[cfg(not(feature = "openai"))]
    #[test]
    fn test_enabled_enrichment_without_openai_feature_is_a_config_error() {
        let mut config = PipelineConfig::default();
        config.enrichment.enabled = true;
        assert!(matches!(
            create_overview_generator(&config),
            Err(CoreError::ConfigError(_))
        ));
    }

    #[test]
    fn test_prompt_lists_recipe_fields() {
        let prompt = overview_prompt(&recipe());
        assert!(prompt.contains("Name: Bibimbap"));
        assert!(prompt.contains("\"overview\" field"));
    }

    #[cfg(feature = "openai")]
    #[tokio::test]
    async fn test_overview_from_fenced_reply() {
        use crate::chat::test_support::{llm_config, mock_chat_server};
        use std::time::Duration;

        let server =
            mock_chat_server("```json\n{\"overview\": \"A colorful rice bowl, easy to customize.\"}\n```").await;
        let generator = LlmOverviewGenerator::new(
            OpenAIChatModel::new(&llm_config(&server)).unwrap(),
            RetryPolicy::once(Duration::from_secs(5)),
        );

        let overview = generator.generate_overview(&recipe()).await.unwrap();
        assert_eq!(overview, "A colorful rice bowl, easy to customize.");
    }

    #[cfg(feature = "openai")]
    #[tokio::test]
    async fn test_reply_without_overview_field_fails() {
        use crate::chat::test_support::{llm_config, mock_chat_server};
        use std::time::Duration;

        let server = mock_chat_server("{\"summary\": \"nope\"}").await;
        let generator = LlmOverviewGenerator::new(
            OpenAIChatModel::new(&llm_config(&server)).unwrap(),
            RetryPolicy::once(Duration::from_secs(5)),
        );
        assert!(generator.generate_overview(&recipe()).await.is_err());
    }
}
