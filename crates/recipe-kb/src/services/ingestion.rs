//! Recipe ingestion: feeds -> normalizer -> relational store

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::data::{
    ContentHash, CoreError, FeedError, FeedReport, IngestionSummary, ItemOutcome, SkipReason,
};
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::{InsertOutcome, RawRecipe, RecipeFeed, RecipeNormalizer, RecipeStore};

/// What happened to a normalized record.
enum Stored {
    New,
    AlreadyPresent,
}

/// Populates the store from a set of feeds.
///
/// Each feed is asked for `ceil(target / feeds)` records. A feed that fails is reported
/// and skipped, a record that cannot be normalized is skipped, and ingestion stops once
/// `target` new recipes have been stored.
pub struct IngestionService {
    store: Arc<dyn RecipeStore>,
    normalizer: Arc<dyn RecipeNormalizer>,
    feeds: Vec<Arc<dyn RecipeFeed>>,
    retry: RetryPolicy,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        normalizer: Arc<dyn RecipeNormalizer>,
        feeds: Vec<Arc<dyn RecipeFeed>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            normalizer,
            feeds,
            retry,
        }
    }

    /// Runs one ingestion pass. With `dry_run` records are normalized and counted but
    /// nothing is written.
    ///
    /// Fails with `CoreError::NoRecipesIngested` when no feed yielded a usable record.
    #[instrument(skip(self), fields(feeds = self.feeds.len()))]
    pub async fn ingest(&self, target: usize, dry_run: bool) -> Result<IngestionSummary, CoreError> {
        if target == 0 {
            return Err(CoreError::ValidationError("target count must be positive".into()));
        }
        if self.feeds.is_empty() {
            return Err(CoreError::ValidationError("no feeds configured".into()));
        }

        let quota = target.div_ceil(self.feeds.len());
        info!(target, quota, dry_run, "Starting recipe ingestion");

        let mut summary = IngestionSummary {
            requested: target,
            dry_run,
            ..Default::default()
        };
        // Hashes seen in this run, only consulted in dry-run mode
        let mut seen: HashSet<ContentHash> = HashSet::new();

        for feed in &self.feeds {
            if summary.inserted >= target {
                debug!(feed = feed.name(), "Target reached, not fetching");
                break;
            }

            let mut report = FeedReport::new(feed.name());
            let records = match self.fetch_feed(feed.as_ref(), quota).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(feed = feed.name(), error = %e, "Feed unavailable, continuing with the rest");
                    report.error = Some(e.to_string());
                    summary.feeds.push(report);
                    continue;
                }
            };
            report.fetched = records.len();

            for raw in &records {
                if summary.inserted >= target {
                    break;
                }
                match self.process_record(feed.name(), raw, dry_run, &mut seen).await {
                    ItemOutcome::Ok(Stored::New) => {
                        report.inserted += 1;
                        summary.inserted += 1;
                    }
                    ItemOutcome::Ok(Stored::AlreadyPresent) => {
                        report.duplicates += 1;
                        summary.duplicates += 1;
                    }
                    ItemOutcome::Skipped(_) => {
                        report.skipped += 1;
                        summary.skipped += 1;
                    }
                }
            }

            info!(
                feed = %report.feed,
                fetched = report.fetched,
                inserted = report.inserted,
                duplicates = report.duplicates,
                skipped = report.skipped,
                "Feed processed"
            );
            summary.feeds.push(report);
        }

        if summary.usable() == 0 {
            error!(
                failed_feeds = summary.failed_feeds().count(),
                skipped = summary.skipped,
                "No usable recipes from any feed"
            );
            return Err(CoreError::NoRecipesIngested);
        }

        if summary.is_partial() {
            warn!(
                requested = summary.requested,
                inserted = summary.inserted,
                "Fewer recipes stored than requested"
            );
        }
        info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            failed_feeds = summary.failed_feeds().count(),
            "Recipe ingestion finished"
        );
        Ok(summary)
    }

    async fn fetch_feed(&self, feed: &dyn RecipeFeed, quota: usize) -> Result<Vec<RawRecipe>, FeedError> {
        let result = with_retry(&self.retry, "fetch feed", || async move {
            feed.fetch(quota).await.map_err(CoreError::from)
        })
        .await;

        result.map_err(|e| match e {
            CoreError::Feed(feed_error) => feed_error,
            CoreError::Timeout(after) => FeedError::Timeout {
                feed: feed.name().to_string(),
                after,
            },
            other => FeedError::Unreachable {
                feed: feed.name().to_string(),
                message: other.to_string(),
            },
        })
    }

    async fn process_record(
        &self,
        feed: &str,
        raw: &RawRecipe,
        dry_run: bool,
        seen: &mut HashSet<ContentHash>,
    ) -> ItemOutcome<Stored> {
        let recipe = match self.normalizer.normalize(feed, raw).await {
            Ok(recipe) => recipe,
            Err(e) => {
                warn!(feed, key = %raw.key, error = %e, "Skipping malformed record");
                return ItemOutcome::Skipped(SkipReason::Malformed(e.to_string()));
            }
        };

        if dry_run {
            let hash = recipe.content_hash();
            if !seen.insert(hash) {
                debug!(feed, name = %recipe.name, "Dry run: duplicate within this run");
                return ItemOutcome::Ok(Stored::AlreadyPresent);
            }
            info!(feed, name = %recipe.name, "Dry run: would insert recipe");
            return ItemOutcome::Ok(Stored::New);
        }

        match self.store.insert_recipe(&recipe).await {
            Ok(InsertOutcome::Inserted(id)) => {
                debug!(feed, id = %id, name = %recipe.name, "Recipe stored");
                ItemOutcome::Ok(Stored::New)
            }
            Ok(InsertOutcome::Duplicate(id)) => {
                debug!(feed, id = %id, name = %recipe.name, "Recipe already stored");
                ItemOutcome::Ok(Stored::AlreadyPresent)
            }
            Err(e) => {
                warn!(feed, name = %recipe.name, error = %e, "Store rejected recipe");
                ItemOutcome::Skipped(SkipReason::StoreRejected(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FieldMappingNormalizer;
    use crate::storage::MemoryRecipeStore;
    use crate::test_utils::fakes::{FailingFeed, StaticFeed};
    use crate::test_utils::fixtures::raw_records;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn service(store: Arc<MemoryRecipeStore>, feeds: Vec<Arc<dyn RecipeFeed>>) -> IngestionService {
        IngestionService::new(
            store,
            Arc::new(FieldMappingNormalizer::new()),
            feeds,
            RetryPolicy {
                attempt_timeout: Duration::from_secs(1),
                max_attempts: 2,
                delay: Duration::from_millis(1),
            },
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_quota_per_feed_and_target_stop() {
        let store = Arc::new(MemoryRecipeStore::new());
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![
            Arc::new(StaticFeed::new("a", raw_records("a", 10))),
            Arc::new(StaticFeed::new("b", raw_records("b", 10))),
            Arc::new(StaticFeed::new("c", raw_records("c", 10))),
        ];

        let summary = service(store.clone(), feeds).ingest(7, false).await.unwrap();

        // ceil(7 / 3) = 3 per feed, stop at 7
        assert_eq!(summary.inserted, 7);
        let fetched: Vec<usize> = summary.feeds.iter().map(|f| f.fetched).collect();
        assert_eq!(fetched, vec![3, 3, 3]);
        assert_eq!(summary.feeds[2].inserted, 1);
        assert_eq!(store.count_recipes().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_feeds_after_target_are_not_fetched() {
        let store = Arc::new(MemoryRecipeStore::new());
        let last = Arc::new(StaticFeed::new("d", raw_records("d", 5)));
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![
            Arc::new(StaticFeed::new("a", raw_records("a", 5))),
            Arc::new(StaticFeed::new("b", raw_records("b", 5))),
            Arc::new(StaticFeed::new("c", raw_records("c", 5))),
            last.clone() as Arc<dyn RecipeFeed>,
        ];

        // ceil(5 / 4) = 2 per feed: a=2, b=2, c=1
        let summary = service(store, feeds).ingest(5, false).await.unwrap();
        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.feeds.len(), 3);
        assert_eq!(last.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_hanging_feed_times_out() {
        let store = Arc::new(MemoryRecipeStore::new());
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![
            Arc::new(FailingFeed::hanging("slow", Duration::from_secs(30))),
            Arc::new(StaticFeed::new("fast", raw_records("fast", 2))),
        ];
        let service = IngestionService::new(
            store,
            Arc::new(FieldMappingNormalizer::new()),
            feeds,
            RetryPolicy::once(Duration::from_millis(20)),
        );

        let summary = service.ingest(4, false).await.unwrap();
        assert_eq!(summary.inserted, 2);
        let error = summary.feeds[0].error.as_deref().unwrap_or_default();
        assert!(error.contains("timed out"), "unexpected error: {}", error);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_feed_is_reported_not_fatal() {
        let store = Arc::new(MemoryRecipeStore::new());
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![
            Arc::new(FailingFeed::unreachable("offline")),
            Arc::new(StaticFeed::new("ok", raw_records("ok", 5))),
        ];

        let summary = service(store, feeds).ingest(10, false).await.unwrap();
        assert_eq!(summary.inserted, 5);
        assert!(summary.is_partial());
        let failed: Vec<&str> = summary.failed_feeds().map(|f| f.feed.as_str()).collect();
        assert_eq!(failed, vec!["offline"]);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let store = Arc::new(MemoryRecipeStore::new());
        let mut records = raw_records("mixed", 2);
        records.push(RawRecipe {
            key: "bad".into(),
            payload: json!({"title": "Only a title"}),
        });
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![Arc::new(StaticFeed::new("mixed", records))];

        let summary = service(store, feeds).ingest(3, false).await.unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_reingest_creates_no_duplicates() {
        let store = Arc::new(MemoryRecipeStore::new());
        let records = raw_records("same", 4);
        let feeds = || -> Vec<Arc<dyn RecipeFeed>> {
            vec![Arc::new(StaticFeed::new("same", records.clone()))]
        };

        service(store.clone(), feeds()).ingest(4, false).await.unwrap();
        let second = service(store.clone(), feeds()).ingest(4, false).await.unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 4);
        assert_eq!(store.count_recipes().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryRecipeStore::new());
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![Arc::new(StaticFeed::new("dry", raw_records("dry", 3)))];

        let summary = service(store.clone(), feeds).ingest(3, true).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.inserted, 3);
        assert_eq!(store.count_recipes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nothing_usable_is_fatal() {
        let store = Arc::new(MemoryRecipeStore::new());
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![
            Arc::new(FailingFeed::unreachable("down-1")),
            Arc::new(FailingFeed::malformed("down-2")),
        ];

        let result = service(store, feeds).ingest(5, false).await;
        assert!(matches!(result, Err(CoreError::NoRecipesIngested)));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let store = Arc::new(MemoryRecipeStore::new());
        assert!(matches!(
            service(store.clone(), vec![]).ingest(5, false).await,
            Err(CoreError::ValidationError(_))
        ));
        let feeds: Vec<Arc<dyn RecipeFeed>> = vec![Arc::new(StaticFeed::new("x", raw_records("x", 1)))];
        assert!(matches!(
            service(store, feeds).ingest(0, false).await,
            Err(CoreError::ValidationError(_))
        ));
    }
}
