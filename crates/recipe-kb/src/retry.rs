//! Bounded timeout and retry for calls to external collaborators

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::data::{CoreError, FeedError};

/// Per-attempt timeout, attempt budget and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A single attempt bounded by `attempt_timeout`.
    pub fn once(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Errors that will not go away by asking again.
fn is_permanent(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::ValidationError(_)
            | CoreError::ConfigError(_)
            | CoreError::Feed(FeedError::MalformedPayload { .. })
            | CoreError::Feed(FeedError::Io { .. })
    )
}

/// Runs `operation` until it succeeds, fails permanently, or the attempt budget is spent.
///
/// Each attempt is cut off after `attempt_timeout` and reported as `CoreError::Timeout`.
/// The last error is returned.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => CoreError::Timeout(policy.attempt_timeout),
        };

        if attempt >= max_attempts || is_permanent(&error) {
            return Err(error);
        }

        warn!(
            operation = label,
            attempt,
            max_attempts,
            error = %error,
            "Attempt failed, retrying in {:?}",
            policy.delay
        );
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
