//! RecipeFeed trait definition for external recipe providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::FeedError;

/// A provider-specific record as fetched from a feed, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecipe {
    /// Provider-side key of the record (map key, `id` field, or position).
    pub key: String,
    pub payload: serde_json::Value,
}

/// Represents a read-only external source of raw recipe records.
#[async_trait]
pub trait RecipeFeed: Send + Sync {
    /// Name used in logs, reports and `source_ref`.
    fn name(&self) -> &str;

    /// Fetches up to `limit` raw records.
    ///
    /// Contract: a feed that cannot be reached or whose payload cannot be parsed as a
    /// collection of records returns an error; individual malformed records are
    /// returned as-is and rejected later by the normalizer.
    async fn fetch(&self, limit: usize) -> Result<Vec<RawRecipe>, FeedError>;
}
