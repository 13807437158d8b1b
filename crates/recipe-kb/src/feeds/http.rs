//! Feed fetched as a JSON document over HTTP(S)

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::data::FeedError;
use crate::feeds::records_from_document;
use crate::traits::{RawRecipe, RecipeFeed};

/// Feed that GETs a JSON document from a URL.
pub struct HttpJsonFeed {
    name: String,
    url: String,
    timeout: Duration,
    client: Client,
}

impl HttpJsonFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout,
            client: Client::new(),
        }
    }

    fn map_request_error(&self, error: reqwest::Error) -> FeedError {
        if error.is_timeout() {
            FeedError::Timeout {
                feed: self.name.clone(),
                after: self.timeout,
            }
        } else {
            FeedError::Unreachable {
                feed: self.name.clone(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl RecipeFeed for HttpJsonFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawRecipe>, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("limit", limit)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unreachable {
                feed: self.name.clone(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| self.map_request_error(e))?;
        let document = serde_json::from_str(&body).map_err(|e| FeedError::MalformedPayload {
            feed: self.name.clone(),
            message: e.to_string(),
        })?;

        let records = records_from_document(&self.name, document, limit)?;
        debug!(feed = %self.name, url = %self.url, count = records.len(), "Fetched feed");
        Ok(records)
    }
}
