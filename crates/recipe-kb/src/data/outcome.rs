//! Per-item outcomes and the batch summaries they aggregate into

use serde::Serialize;
use std::fmt;

use crate::data::identifiers::RecipeId;

/// Why an item was left out of a batch without failing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// The provider record could not be mapped onto the recipe schema.
    Malformed(String),
    /// Nothing left to embed after normalization.
    EmptyText,
    /// The embedding model failed or timed out for this item.
    EmbeddingFailed(String),
    /// The produced vector does not match the store's dimensionality.
    DimensionMismatch { expected: usize, actual: usize },
    /// The store rejected the write.
    StoreRejected(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed record: {}", msg),
            SkipReason::EmptyText => write!(f, "empty embedding text"),
            SkipReason::EmbeddingFailed(msg) => write!(f, "embedding failed: {}", msg),
            SkipReason::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, actual)
            }
            SkipReason::StoreRejected(msg) => write!(f, "store rejected write: {}", msg),
        }
    }
}

/// Result of processing one item in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Ok(T),
    Skipped(SkipReason),
}

/// Per-feed accounting for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedReport {
    pub feed: String,
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    /// Set when the feed itself failed (unreachable, timeout, malformed payload).
    pub error: Option<String>,
}

impl FeedReport {
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            ..Default::default()
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionSummary {
    pub requested: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub dry_run: bool,
    pub feeds: Vec<FeedReport>,
}

impl IngestionSummary {
    pub fn failed_feeds(&self) -> impl Iterator<Item = &FeedReport> {
        self.feeds.iter().filter(|f| f.failed())
    }

    /// Records that were recognized as recipes, whether new or already stored.
    pub fn usable(&self) -> usize {
        self.inserted + self.duplicates
    }

    /// Fewer new recipes were stored than requested.
    pub fn is_partial(&self) -> bool {
        self.inserted < self.requested
    }
}

/// Aggregate of one embedding generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub candidates: usize,
    pub embedded: usize,
    pub already_embedded: usize,
    pub skipped: Vec<(RecipeId, SkipReason)>,
    pub model: String,
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(
            SkipReason::EmbeddingFailed("timed out".into()).to_string(),
            "embedding failed: timed out"
        );
        assert_eq!(
            SkipReason::DimensionMismatch { expected: 384, actual: 2 }.to_string(),
            "dimension mismatch: expected 384, got 2"
        );
    }

    #[test]
    fn test_ingestion_summary_counts() {
        let mut broken = FeedReport::new("broken");
        broken.error = Some("connection refused".into());
        let summary = IngestionSummary {
            requested: 50,
            inserted: 20,
            duplicates: 5,
            skipped: 1,
            dry_run: false,
            feeds: vec![FeedReport::new("ok"), broken],
        };
        assert_eq!(summary.usable(), 25);
        assert!(summary.is_partial());
        assert_eq!(summary.failed_feeds().count(), 1);
    }
}
