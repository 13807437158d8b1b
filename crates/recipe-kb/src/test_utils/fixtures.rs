use fake::faker::lorem::en::{Sentence, Word, Words};
use fake::Fake;
use serde_json::json;

use crate::data::NewRecipe;
use crate::traits::RawRecipe;

/// A complete recipe whose content, and therefore content hash, is derived from `name`.
pub fn sample_recipe(name: &str) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        ingredients: vec![format!("1 cup {}", name.to_lowercase()), "salt".into()],
        instructions: vec![format!("Prepare the {}.", name.to_lowercase()), "Serve.".into()],
        description: Some(format!("A simple {}", name.to_lowercase())),
        cuisine_type: Some("Home".into()),
        prep_time: Some(10),
        cook_time: Some(20),
        total_time: None,
        servings: Some(2),
        source: Some("test-kitchen".into()),
        source_ref: None,
    }
}

/// A provider record in an epicurious-like layout with fake text. `index` keeps titles
/// unique within and across feeds.
pub fn raw_record(feed: &str, index: usize) -> RawRecipe {
    let title_words: Vec<String> = Words(2..4).fake();
    let ingredients: Vec<String> = (0..(3..7).fake::<usize>())
        .map(|_| format!("{} {}", (1..5).fake::<u8>(), Word().fake::<String>()))
        .collect();
    let directions: Vec<String> = (0..(2..5).fake::<usize>())
        .map(|_| Sentence(4..9).fake())
        .collect();

    RawRecipe {
        key: index.to_string(),
        payload: json!({
            "title": format!("{} {}-{}", title_words.join(" "), feed, index),
            "ingredients": ingredients,
            "directions": directions,
            "prepTime": format!("PT{}M", (5..30).fake::<u32>()),
            "cookTime": (10..90).fake::<u32>(),
            "servings": (1..8).fake::<u32>(),
        }),
    }
}

pub fn raw_records(feed: &str, count: usize) -> Vec<RawRecipe> {
    (0..count).map(|i| raw_record(feed, i)).collect()
}
