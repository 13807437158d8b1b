//! Rendering of a recipe into the text that gets embedded

use crate::data::Recipe;

fn or_na(value: Option<u32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Whether the recipe has something worth embedding: a name, an ingredient and an
/// instruction that are non-empty after trimming.
pub fn has_embeddable_content(recipe: &Recipe) -> bool {
    !recipe.name.trim().is_empty()
        && recipe.ingredients.iter().any(|i| !i.trim().is_empty())
        && recipe.instructions.iter().any(|i| !i.trim().is_empty())
}

/// Renders `recipe` as labelled lines, with ingredients as bullets and instructions
/// numbered, followed by the overview when one is given.
pub fn format_recipe_text(recipe: &Recipe, overview: Option<&str>) -> String {
    let mut lines = vec![
        format!("Recipe: {}", recipe.name),
        format!("Description: {}", recipe.description.as_deref().unwrap_or("")),
        format!("Cuisine Type: {}", recipe.cuisine_type.as_deref().unwrap_or("")),
        "Ingredients:".to_string(),
    ];
    lines.extend(recipe.ingredients.iter().map(|i| format!("- {}", i)));
    lines.push("Instructions:".to_string());
    lines.extend(
        recipe
            .instructions
            .iter()
            .enumerate()
            .map(|(n, step)| format!("{}. {}", n + 1, step)),
    );
    lines.push(format!("Prep Time: {} minutes", or_na(recipe.prep_time)));
    lines.push(format!("Cook Time: {} minutes", or_na(recipe.cook_time)));
    lines.push(format!("Total Time: {} minutes", or_na(recipe.total_time)));
    lines.push(format!("Servings: {}", or_na(recipe.servings)));

    if let Some(overview) = overview.map(str::trim).filter(|o| !o.is_empty()) {
        lines.push("\nOverview:".to_string());
        lines.push(overview.to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RecipeId;
    use crate::test_utils::fixtures::sample_recipe;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn recipe() -> Recipe {
        let mut new = sample_recipe("Shakshuka");
        new.ingredients = vec!["4 eggs".into(), "1 can tomatoes".into()];
        new.instructions = vec!["Simmer tomatoes.".into(), "Poach eggs.".into()];
        new.description = Some("Eggs in tomato sauce".into());
        new.cuisine_type = Some("North African".into());
        new.prep_time = Some(10);
        new.cook_time = Some(20);
        new.total_time = Some(30);
        new.servings = None;
        Recipe::from_new(RecipeId(1), new, Utc::now())
    }

    #[test]
    fn test_layout() {
        let expected = "Recipe: Shakshuka\n\
                        Description: Eggs in tomato sauce\n\
                        Cuisine Type: North African\n\
                        Ingredients:\n\
                        - 4 eggs\n\
                        - 1 can tomatoes\n\
                        Instructions:\n\
                        1. Simmer tomatoes.\n\
                        2. Poach eggs.\n\
                        Prep Time: 10 minutes\n\
                        Cook Time: 20 minutes\n\
                        Total Time: 30 minutes\n\
                        Servings: N/A";
        assert_eq!(format_recipe_text(&recipe(), None), expected);
    }

    #[test]
    fn test_overview_is_appended() {
        let text = format_recipe_text(&recipe(), Some("Great for brunch."));
        assert!(text.ends_with("Servings: N/A\n\nOverview:\nGreat for brunch."));
        assert_eq!(format_recipe_text(&recipe(), Some("  ")), format_recipe_text(&recipe(), None));
    }

    #[test]
    fn test_embeddable_content() {
        let mut r = recipe();
        assert!(has_embeddable_content(&r));
        r.instructions = vec!["   ".into()];
        assert!(!has_embeddable_content(&r));
    }
}
