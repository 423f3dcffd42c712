//! Retry logic with exponential backoff
//!
//! Every request the pipeline makes (set lookup, bulk index, search, image
//! fetch) goes through [`with_retry`]. Transient failures are retried with
//! exponential backoff and optional jitter; permanent ones return at once.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, HTTP 429/5xx) return `true`.
/// Permanent failures (404, malformed payloads, disk errors) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Error::HttpStatus { status, .. } => is_transient_status(*status),
            Error::Io(e) => is_transient_io(e),
            // disk-side failures are never transient for our purposes
            Error::Path { .. } => false,
            Error::Config { .. }
            | Error::Serialization(_)
            | Error::Api(_)
            | Error::SetNotFound(_)
            | Error::BulkFeedMissing(_)
            | Error::Feed(_)
            | Error::Other(_) => false,
        }
    }
}

/// 408, 429 and every 5xx are worth another attempt
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

fn is_transient_io(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::UnexpectedEof
    )
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error once `config.max_attempts`
/// retries are used up (so at most `max_attempts + 1` calls are made).
///
/// # Example
///
/// ```no_run
/// use scryfall_dl::retry::with_retry;
/// use scryfall_dl::config::RetryConfig;
/// use scryfall_dl::error::Error;
///
/// # async fn example() -> Result<(), Error> {
/// let config = RetryConfig::default();
/// let body = with_retry(&config, || async {
///     Ok::<String, Error>("payload".to_string())
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut retries_left = config.max_attempts;
    let mut calls: u32 = 0;

    loop {
        calls += 1;
        let error = match operation().await {
            Ok(value) => {
                if calls > 1 {
                    tracing::info!(calls, "Recovered after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if retries_left == 0 {
            tracing::debug!(error = %error, calls, "Giving up, no retries left");
            return Err(error);
        }
        retries_left -= 1;

        let pause = if config.jitter { add_jitter(delay) } else { delay };
        tracing::warn!(
            error = %error,
            retries_left,
            pause_ms = pause.as_millis() as u64,
            "Transient failure, backing off"
        );
        tokio::time::sleep(pause).await;
        delay = grow(delay, config);
    }
}

/// Next backoff step, capped at `max_delay`
fn grow(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier).min(config.max_delay)
}

/// Stretch `delay` by a random factor in `1.0..=2.0`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
