//! Feed backed by a JSON document on local disk

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::data::FeedError;
use crate::feeds::records_from_document;
use crate::traits::{RawRecipe, RecipeFeed};

/// Feed backed by a local JSON document.
pub struct JsonFileFeed {
    name: String,
    path: PathBuf,
}

impl JsonFileFeed {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl RecipeFeed for JsonFileFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawRecipe>, FeedError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FeedError::Io {
                feed: self.name.clone(),
                source,
            })?;

        let document = serde_json::from_str(&raw).map_err(|e| FeedError::MalformedPayload {
            feed: self.name.clone(),
            message: e.to_string(),
        })?;

        let records = records_from_document(&self.name, document, limit)?;
        debug!(feed = %self.name, path = %self.path.display(), count = records.len(), "Read feed file");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_object_map_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"1": {{"title": "Toast", "ingredients": ["bread"], "directions": ["Toast it."]}}}}"#
        )
        .unwrap();

        let feed = JsonFileFeed::new("local", file.path());
        let records = feed.fetch(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "1");
        assert_eq!(records[0].payload["title"], "Toast");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let feed = JsonFileFeed::new("gone", "/nonexistent/recipes.json");
        assert!(matches!(feed.fetch(5).await, Err(FeedError::Io { .. })));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let feed = JsonFileFeed::new("bad", file.path());
        assert!(matches!(feed.fetch(5).await, Err(FeedError::MalformedPayload { .. })));
    }
}
