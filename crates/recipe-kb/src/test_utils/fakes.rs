use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::data::{CoreError, FeedError, Recipe};
use crate::embedding::HashingEmbeddingGenerator;
use crate::traits::{EmbeddingGenerator, OverviewGenerator, RawRecipe, RecipeFeed};

/// Feed serving a fixed list of records.
pub struct StaticFeed {
    name: String,
    records: Vec<RawRecipe>,
    fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new(name: impl Into<String>, records: Vec<RawRecipe>) -> Self {
        Self {
            name: name.into(),
            records,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeFeed for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawRecipe>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}

enum Failure {
    Unreachable,
    Malformed,
    Hang(Duration),
}

/// Feed that never yields records.
pub struct FailingFeed {
    name: String,
    failure: Failure,
}

impl FailingFeed {
    pub fn unreachable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: Failure::Unreachable,
        }
    }

    pub fn malformed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: Failure::Malformed,
        }
    }

    /// Sleeps for `delay` before answering, to trip fetch timeouts.
    pub fn hanging(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            failure: Failure::Hang(delay),
        }
    }
}

#[async_trait]
impl RecipeFeed for FailingFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<RawRecipe>, FeedError> {
        match &self.failure {
            Failure::Unreachable => Err(FeedError::Unreachable {
                feed: self.name.clone(),
                message: "connection refused".into(),
            }),
            Failure::Malformed => Err(FeedError::MalformedPayload {
                feed: self.name.clone(),
                message: "expected an array or object of recipe records".into(),
            }),
            Failure::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Hashing generator that fails for any text containing `poison`.
pub struct FailingEmbeddingGenerator {
    inner: HashingEmbeddingGenerator,
    poison: String,
}

impl FailingEmbeddingGenerator {
    pub fn new(dimension: usize, poison: impl Into<String>) -> Self {
        Self {
            inner: HashingEmbeddingGenerator::new(dimension),
            poison: poison.into(),
        }
    }
}

#[async_trait]
impl EmbeddingGenerator for FailingEmbeddingGenerator {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        if text.contains(&self.poison) {
            return Err(CoreError::EmbeddingError("model overloaded (503)".into()));
        }
        self.inner.generate_embedding(text).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }
}

/// Generator returning the same vector for every text.
pub struct FixedEmbeddingGenerator {
    vector: Vec<f32>,
}

impl FixedEmbeddingGenerator {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingGenerator for FixedEmbeddingGenerator {
    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>, CoreError> {
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model_id(&self) -> String {
        "fixed".to_string()
    }
}

/// Overview generator with a canned reply, or one that always fails.
pub struct StaticOverviewGenerator {
    reply: Option<String>,
}

impl StaticOverviewGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl OverviewGenerator for StaticOverviewGenerator {
    async fn generate_overview(&self, _recipe: &Recipe) -> Result<String, CoreError> {
        self.reply
            .clone()
            .ok_or_else(|| CoreError::ModelResponseError("overview unavailable".into()))
    }
}
