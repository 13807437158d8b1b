//! Key-based mapping of common provider record layouts onto the recipe schema

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::data::{CoreError, NewRecipe};
use crate::traits::{RawRecipe, RecipeNormalizer};

const NAME_KEYS: &[&str] = &["name", "title"];
const INGREDIENT_KEYS: &[&str] = &["ingredients", "recipeIngredient"];
const INSTRUCTION_KEYS: &[&str] = &["instructions", "directions", "steps", "recipeInstructions"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc"];
const CUISINE_KEYS: &[&str] = &["cuisine_type", "cuisine", "recipeCuisine"];
const PREP_KEYS: &[&str] = &["prep_time", "prepTime"];
const COOK_KEYS: &[&str] = &["cook_time", "cookTime"];
const TOTAL_KEYS: &[&str] = &["total_time", "totalTime"];
const SERVINGS_KEYS: &[&str] = &["servings", "yield", "recipeYield"];

/// Maps provider records by looking up well-known keys.
///
/// Lists may be arrays (of strings or of `{"text": ...}` steps) or newline-separated
/// text. Durations may be minutes as numbers, `"15"`, `"1 hr 30 min"`, or ISO-8601
/// (`PT1H15M`). The feed name is the default `source`.
#[derive(Debug, Clone, Default)]
pub struct FieldMappingNormalizer;

impl FieldMappingNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Maps one record payload; `key` becomes part of `source_ref`.
    pub fn map_value(&self, feed: &str, key: &str, payload: &Value) -> Result<NewRecipe, CoreError> {
        let record = payload.as_object().ok_or_else(|| {
            CoreError::ValidationError(format!("record '{}' is not a JSON object", key))
        })?;

        let recipe = NewRecipe {
            name: text_field(record, NAME_KEYS).unwrap_or_default(),
            ingredients: list_field(record, INGREDIENT_KEYS),
            instructions: list_field(record, INSTRUCTION_KEYS),
            description: text_field(record, DESCRIPTION_KEYS),
            cuisine_type: text_field(record, CUISINE_KEYS),
            prep_time: minutes_field(record, PREP_KEYS)?,
            cook_time: minutes_field(record, COOK_KEYS)?,
            total_time: minutes_field(record, TOTAL_KEYS)?,
            servings: servings_field(record)?,
            source: text_field(record, &["source"]).or_else(|| Some(feed.to_string())),
            source_ref: Some(format!("{}:{}", feed, key)),
        }
        .with_derived_total_time();

        recipe.validate()?;
        Ok(recipe)
    }
}

#[async_trait]
impl RecipeNormalizer for FieldMappingNormalizer {
    async fn normalize(&self, feed: &str, raw: &RawRecipe) -> Result<NewRecipe, CoreError> {
        self.map_value(feed, &raw.key, &raw.payload)
    }
}

fn first<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| !v.is_null())
}

fn text_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
}

fn list_field(record: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let items: Vec<String> = match first(record, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(list_item).collect(),
        Some(Value::String(text)) => text.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .iter()
        .map(|line| strip_list_marker(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // schema.org HowToStep and similar
        Value::Object(step) => step
            .get("text")
            .or_else(|| step.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Drops a leading bullet (`-`, `*`, `•`) or step number (`1.`, `2)`).
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}

fn minutes_field(record: &Map<String, Value>, keys: &[&str]) -> Result<Option<u32>, CoreError> {
    match first(record, keys) {
        None => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(m) if m >= 0.0 && m <= u32::MAX as f64 => Ok(Some(m.round() as u32)),
            _ => Err(CoreError::ValidationError(format!("invalid duration: {}", n))),
        },
        Some(Value::String(s)) => {
            let minutes = parse_duration(s);
            if minutes.is_none() && !s.trim().is_empty() {
                debug!(value = %s, "Ignoring unrecognized duration");
            }
            Ok(minutes)
        }
        Some(other) => Err(CoreError::ValidationError(format!("invalid duration: {}", other))),
    }
}

fn servings_field(record: &Map<String, Value>) -> Result<Option<u32>, CoreError> {
    let value = match first(record, SERVINGS_KEYS) {
        // recipeYield is sometimes ["4", "4 servings"]
        Some(Value::Array(items)) => items.first(),
        other => other,
    };
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(s) if s > 0 && s <= u32::MAX as i64 => Ok(Some(s as u32)),
            _ => Err(CoreError::ValidationError(format!("invalid servings: {}", n))),
        },
        Some(Value::String(s)) => Ok(leading_number(s)),
        Some(other) => Err(CoreError::ValidationError(format!("invalid servings: {}", other))),
    }
}

/// First run of digits in `text`, e.g. `"Serves 4-6"` gives 4.
fn leading_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Parses a duration into whole minutes.
///
/// Accepts bare minutes (`"15"`), unit text (`"15 min"`, `"1 hr 30 mins"`, `"1h30m"`) and
/// ISO-8601 durations (`"PT1H15M"`, `"P1DT2H"`). Returns `None` when nothing is recognized
/// or the total does not fit in `u32` minutes.
pub fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if let Ok(minutes) = text.parse::<u32>() {
        return Some(minutes);
    }
    if text.starts_with('p') {
        return parse_iso8601(&text[1..]);
    }

    let mut total: u64 = 0;
    let mut pending: Option<u64> = None;
    let mut found = false;
    for token in tokens(&text) {
        match token {
            Token::Number(n) => {
                if let Some(previous) = pending.replace(n) {
                    // Number with no unit counts as minutes
                    total = total.checked_add(previous)?;
                    found = true;
                }
            }
            Token::Word(word) => {
                if let Some(n) = pending.take() {
                    let factor = match word.chars().next() {
                        Some('d') => 1440,
                        Some('h') => 60,
                        Some('m') => 1,
                        _ => 0,
                    };
                    total = total.checked_add(n.checked_mul(factor)?)?;
                    found |= factor > 0;
                }
            }
        }
    }
    if let Some(n) = pending {
        total = total.checked_add(n)?;
        found = true;
    }

    if found {
        u32::try_from(total).ok()
    } else {
        None
    }
}

fn parse_iso8601(body: &str) -> Option<u32> {
    let mut total: u64 = 0;
    let mut in_time = false;
    let mut digits = String::new();
    let mut found = false;

    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if c == 't' {
            in_time = true;
            continue;
        }
        let n: u64 = digits.parse().ok()?;
        digits.clear();
        let minutes = match (in_time, c) {
            (false, 'd') => n.checked_mul(1440)?,
            (false, 'w') => n.checked_mul(7 * 1440)?,
            (true, 'h') => n.checked_mul(60)?,
            (true, 'm') => n,
            (true, 's') => n / 60,
            _ => return None,
        };
        total = total.checked_add(minutes)?;
        found = true;
    }

    if !digits.is_empty() || !found {
        return None;
    }
    u32::try_from(total).ok()
}

enum Token<'a> {
    Number(u64),
    Word(&'a str),
}

fn tokens(text: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| c.is_ascii_alphanumeric()) {
        rest = &rest[start..];
        let is_digit = rest.starts_with(|c: char| c.is_ascii_digit());
        let end = rest
            .find(|c: char| {
                if is_digit {
                    !c.is_ascii_digit()
                } else {
                    !c.is_ascii_alphabetic()
                }
            })
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        if is_digit {
            match token.parse() {
                Ok(n) => out.push(Token::Number(n)),
                Err(_) => return Vec::new(),
            }
        } else {
            out.push(Token::Word(token));
        }
        rest = tail;
    }
    out
}
