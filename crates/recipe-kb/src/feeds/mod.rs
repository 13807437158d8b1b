//! Feed adapters: local JSON files and JSON over HTTP

pub mod http;
pub mod json_file;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{FeedConfig, FeedKind};
use crate::data::FeedError;
use crate::traits::{RawRecipe, RecipeFeed};

pub use http::HttpJsonFeed;
pub use json_file::JsonFileFeed;

/// Builds the feed described by `config`; `default_timeout` applies when the feed sets none.
pub fn create_feed(config: &FeedConfig, default_timeout: Duration) -> Arc<dyn RecipeFeed> {
    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(default_timeout);

    match config.kind {
        FeedKind::JsonFile => Arc::new(JsonFileFeed::new(&config.name, &config.location)),
        FeedKind::Http => Arc::new(HttpJsonFeed::new(&config.name, &config.location, timeout)),
    }
}

/// Extracts up to `limit` records from a feed document.
///
/// Accepted shapes: an array of records, `{"recipes": [...]}`, or an object map of
/// `key -> record`. Array records are keyed by their `id` field, else by position.
/// Records are taken in document order.
pub(crate) fn records_from_document(
    feed: &str,
    document: Value,
    limit: usize,
) -> Result<Vec<RawRecipe>, FeedError> {
    let malformed = |message: &str| FeedError::MalformedPayload {
        feed: feed.to_string(),
        message: message.to_string(),
    };

    match document {
        Value::Array(items) => Ok(keyed_by_id(items, limit)),
        Value::Object(mut map) => {
            if let Some(recipes) = map.remove("recipes") {
                return match recipes {
                    Value::Array(items) => Ok(keyed_by_id(items, limit)),
                    _ => Err(malformed("'recipes' is not an array")),
                };
            }
            if map.values().any(|v| !v.is_object()) {
                return Err(malformed("expected an object map of recipe records"));
            }
            Ok(map
                .into_iter()
                .take(limit)
                .map(|(key, payload)| RawRecipe { key, payload })
                .collect())
        }
        _ => Err(malformed("expected an array or object of recipe records")),
    }
}

fn keyed_by_id(items: Vec<Value>, limit: usize) -> Vec<RawRecipe> {
    items
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, payload)| {
            let key = match payload.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => index.to_string(),
            };
            RawRecipe { key, payload }
        })
        .collect()
}
