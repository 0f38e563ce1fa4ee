//! Retry with exponential backoff for transient network failures.

use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,
    /// Initial backoff delay
    pub initial_interval: Duration,
    /// Maximum backoff delay
    pub max_interval: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl RetryConfig {
    /// Network retry for catalog fetches (250ms initial, 5s max, 2 retries).
    pub fn network() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    /// No retries; used where the fallback ladder handles failures instead.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let backoff_ms = (self.initial_interval.as_millis() as f64 * multiplier) as u64;
        Duration::from_millis(backoff_ms).min(self.max_interval)
    }
}

/// Trait for determining if an error is retryable.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_timeout()
            || self.is_connect()
            || self
                .status()
                .is_none_or(|s| s.is_server_error() || s.as_u16() == 429)
    }
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind::*;
        matches!(
            self.kind(),
            ConnectionRefused | ConnectionReset | ConnectionAborted | TimedOut | Interrupted
        )
    }
}

/// Execute an operation, retrying retryable errors with backoff.
pub async fn retry<F, Fut, T, E>(config: RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                attempt += 1;
                if attempt > config.max_retries {
                    return Err(err);
                }
                tokio::time::sleep(config.backoff(attempt)).await;
            }
        }
    }
}
