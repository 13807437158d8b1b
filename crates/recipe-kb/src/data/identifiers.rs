//! Identifier types for the recipe knowledge base

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Store-assigned primary key of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub i64);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecipeId {
    fn from(value: i64) -> Self {
        RecipeId(value)
    }
}

/// SHA-256 fingerprint of a recipe's normalized content, used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ContentHash {
    /// Hashes name, ingredients and instructions after case folding and whitespace collapsing.
    pub fn compute(name: &str, ingredients: &[String], instructions: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical(name).as_bytes());
        for section in [ingredients, instructions] {
            // Section separator so moving a line between lists changes the hash
            hasher.update([0x1e]);
            for line in section {
                hasher.update(canonical(line).as_bytes());
                hasher.update([0x1f]);
            }
        }
        ContentHash(format!("{:x}", hasher.finalize()))
    }
}

fn canonical(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recipe_id_display() {
        assert_eq!(RecipeId(42).to_string(), "42");
        assert_eq!(RecipeId::from(7), RecipeId(7));
    }

    #[test]
    fn test_content_hash_ignores_case_and_spacing() {
        let a = ContentHash::compute("Tomato Soup", &lines(&["2 tomatoes"]), &lines(&["Simmer."]));
        let b = ContentHash::compute("  tomato   soup ", &lines(&["2  Tomatoes"]), &lines(&["simmer."]));
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
    }

    #[test]
    fn test_content_hash_distinguishes_sections() {
        let a = ContentHash::compute("Soup", &lines(&["water", "salt"]), &lines(&[]));
        let b = ContentHash::compute("Soup", &lines(&["water"]), &lines(&["salt"]));
        assert_ne!(a, b);
    }
}
