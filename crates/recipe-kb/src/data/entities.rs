//! Domain entities persisted by the recipe knowledge base

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::errors::CoreError;
use crate::data::identifiers::{ContentHash, RecipeId};

/// A normalized recipe that has not been persisted yet.
///
/// Produced by a `RecipeNormalizer` from a provider-specific record and handed to the
/// store, which assigns the id. Durations are whole minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default)]
    pub cook_time: Option<u32>,
    #[serde(default)]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub source: Option<String>,
    /// Provider-side reference in the form `<feed>:<key>`, informational only.
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl NewRecipe {
    /// Checks the schema invariants: required text present, lists non-empty,
    /// servings positive.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError("recipe name is empty".into()));
        }
        if !self.ingredients.iter().any(|i| !i.trim().is_empty()) {
            return Err(CoreError::ValidationError(format!(
                "recipe '{}' has no ingredients",
                self.name
            )));
        }
        if !self.instructions.iter().any(|i| !i.trim().is_empty()) {
            return Err(CoreError::ValidationError(format!(
                "recipe '{}' has no instructions",
                self.name
            )));
        }
        if self.servings == Some(0) {
            return Err(CoreError::ValidationError(format!(
                "recipe '{}' has zero servings",
                self.name
            )));
        }
        Ok(())
    }

    /// Fills `total_time` from prep and cook time when the provider omitted it.
    pub fn with_derived_total_time(mut self) -> Self {
        if self.total_time.is_none() {
            if let (Some(prep), Some(cook)) = (self.prep_time, self.cook_time) {
                self.total_time = Some(prep.saturating_add(cook));
            }
        }
        self
    }

    pub fn content_hash(&self) -> ContentHash {
        ContentHash::compute(&self.name, &self.ingredients, &self.instructions)
    }
}

/// A persisted recipe row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub description: Option<String>,
    pub cuisine_type: Option<String>,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub servings: Option<u32>,
    pub source: Option<String>,
    pub source_ref: Option<String>,
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Builds the persisted form of `new` under the store-assigned `id`.
    pub fn from_new(id: RecipeId, new: NewRecipe, created_at: DateTime<Utc>) -> Self {
        let content_hash = new.content_hash();
        Self {
            id,
            name: new.name,
            ingredients: new.ingredients,
            instructions: new.instructions,
            description: new.description,
            cuisine_type: new.cuisine_type,
            prep_time: new.prep_time,
            cook_time: new.cook_time,
            total_time: new.total_time,
            servings: new.servings,
            source: new.source,
            source_ref: new.source_ref,
            content_hash,
            created_at,
        }
    }

    /// The content fields of this recipe, without store-assigned metadata.
    pub fn to_new(&self) -> NewRecipe {
        NewRecipe {
            name: self.name.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            description: self.description.clone(),
            cuisine_type: self.cuisine_type.clone(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            total_time: self.total_time,
            servings: self.servings,
            source: self.source.clone(),
            source_ref: self.source_ref.clone(),
        }
    }
}

/// Vector representation of one recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub recipe_id: RecipeId,
    pub vector: Vec<f32>,
    /// Identifier of the model that produced `vector`.
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    pub fn new(recipe_id: RecipeId, vector: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            recipe_id,
            vector,
            model: model.into(),
            created_at: Utc::now(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A query hit: the recipe and its similarity to the query, higher is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecipe {
    pub recipe: Recipe,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> NewRecipe {
        NewRecipe {
            name: "Spaghetti Carbonara".into(),
            ingredients: vec!["spaghetti".into(), "eggs".into(), "pancetta".into()],
            instructions: vec!["Cook pasta.".into(), "Mix eggs and cheese.".into()],
            description: Some("Roman classic".into()),
            cuisine_type: Some("Italian".into()),
            prep_time: Some(10),
            cook_time: Some(15),
            total_time: None,
            servings: Some(2),
            source: Some("epicurious.com".into()),
            source_ref: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_recipe() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required_fields() {
        let mut recipe = sample();
        recipe.name = "   ".into();
        assert!(matches!(recipe.validate(), Err(CoreError::ValidationError(_))));

        let mut recipe = sample();
        recipe.ingredients = vec!["".into()];
        assert!(recipe.validate().is_err());

        let mut recipe = sample();
        recipe.instructions.clear();
        assert!(recipe.validate().is_err());

        let mut recipe = sample();
        recipe.servings = Some(0);
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_total_time_is_derived_only_when_missing() {
        assert_eq!(sample().with_derived_total_time().total_time, Some(25));

        let mut explicit = sample();
        explicit.total_time = Some(40);
        assert_eq!(explicit.with_derived_total_time().total_time, Some(40));

        let mut partial = sample();
        partial.cook_time = None;
        assert_eq!(partial.with_derived_total_time().total_time, None);
    }

    #[test]
    fn test_recipe_to_new_returns_original_fields() {
        let new = sample();
        let recipe = Recipe::from_new(RecipeId(3), new.clone(), Utc::now());
        assert_eq!(recipe.to_new(), new);
        assert_eq!(recipe.content_hash, new.content_hash());
    }
}
