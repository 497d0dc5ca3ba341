//! Bounded retry with pre-attempt jitter and linear backoff
//!
//! Every item fetch runs through an explicit per-item state machine:
//!
//! ```text
//! Pending -> Attempting -> Found
//!                       -> NotFound
//!                       -> Retrying -> Attempting
//!                       -> Exhausted
//! ```
//!
//! `Retrying` is bounded by the attempt counter. A randomized delay precedes
//! every attempt; a fixed delay (no growth, no jitter) separates a failed
//! attempt from the next one.
//!
//! # Example
//!
//! ```no_run
//! use gallery_mirror::config::{JitterConfig, RetryConfig};
//! use gallery_mirror::error::SourceError;
//! use gallery_mirror::retry::{Attempted, attempt_with_retry};
//!
//! # async fn example() {
//! let retry = RetryConfig::default();
//! let jitter = JitterConfig::disabled();
//! let outcome = attempt_with_retry(&retry, &jitter, |_attempt| async {
//!     Ok::<_, SourceError>(Some("payload"))
//! })
//! .await;
//! assert!(matches!(outcome, Attempted::Found { attempts: 1, .. }));
//! # }
//! ```

use crate::config::{JitterConfig, RetryConfig};
use crate::error::SourceError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, bad responses, decode errors) should
/// return `true`. A `false` ends the state machine after the current attempt.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection failures and timeouts
            SourceError::Transport(_) => true,
            // Error pages from an overloaded or flaky remote
            SourceError::Status { .. } => true,
            // Truncated or garbled bodies usually parse on a second try
            SourceError::Parse(_) => true,
        }
    }
}

/// State of one item's attempt loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    /// Not started
    Pending,
    /// Running attempt number `attempt` (1-based)
    Attempting {
        /// Current attempt number
        attempt: u32,
    },
    /// Waiting out the backoff after `attempt` failed
    Retrying {
        /// Attempt that just failed
        attempt: u32,
    },
}

/// Terminal result of the attempt loop
#[derive(Debug, PartialEq)]
pub enum Attempted<T, E> {
    /// The operation produced a value
    Found {
        /// The produced value
        value: T,
        /// Attempts made, including the successful one
        attempts: u32,
    },
    /// The operation reported the target as absent; never retried
    NotFound {
        /// Attempts made
        attempts: u32,
    },
    /// Every allowed attempt failed, or the error was not retryable
    Exhausted {
        /// Error from the final attempt
        last_error: E,
        /// Attempts made
        attempts: u32,
    },
}

impl<T, E> Attempted<T, E> {
    /// Attempts consumed before reaching this result
    pub fn attempts(&self) -> u32 {
        match self {
            Attempted::Found { attempts, .. }
            | Attempted::NotFound { attempts }
            | Attempted::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `operation` until it yields a value, reports absence, or runs out of attempts
///
/// The operation receives the 1-based attempt number and returns
/// `Ok(Some(value))` on success, `Ok(None)` when the target does not exist,
/// or `Err(e)` on failure.
///
/// # Arguments
///
/// * `retry` - Attempt limit and fixed backoff
/// * `jitter` - Randomized delay applied before every attempt
/// * `operation` - Async closure performing one attempt
pub async fn attempt_with_retry<F, Fut, T, E>(
    retry: &RetryConfig,
    jitter: &JitterConfig,
    mut operation: F,
) -> Attempted<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = retry.retry_count.max(1);
    let mut state = AttemptState::Pending;

    loop {
        state = match state {
            AttemptState::Pending => AttemptState::Attempting { attempt: 1 },

            AttemptState::Attempting { attempt } => {
                if let Some(delay) = jitter_delay(jitter) {
                    tokio::time::sleep(delay).await;
                }

                match operation(attempt).await {
                    Ok(Some(value)) => {
                        if attempt > 1 {
                            tracing::info!(attempts = attempt, "Operation succeeded after retry");
                        }
                        return Attempted::Found {
                            value,
                            attempts: attempt,
                        };
                    }
                    Ok(None) => {
                        return Attempted::NotFound { attempts: attempt };
                    }
                    Err(e) if e.is_retryable() && attempt < max_attempts => {
                        tracing::warn!(
                            error = %e,
                            attempt = attempt,
                            max_attempts = max_attempts,
                            delay_ms = retry.retry_backoff.as_millis(),
                            "Attempt failed, retrying"
                        );
                        AttemptState::Retrying { attempt }
                    }
                    Err(e) => {
                        if e.is_retryable() {
                            tracing::error!(
                                error = %e,
                                attempts = attempt,
                                "Operation failed after all attempts exhausted"
                            );
                        } else {
                            tracing::error!(error = %e, "Operation failed with non-retryable error");
                        }
                        return Attempted::Exhausted {
                            last_error: e,
                            attempts: attempt,
                        };
                    }
                }
            }

            AttemptState::Retrying { attempt } => {
                if !retry.retry_backoff.is_zero() {
                    tokio::time::sleep(retry.retry_backoff).await;
                }
                AttemptState::Attempting {
                    attempt: attempt + 1,
                }
            }
        };
    }
}

/// Draw the pre-attempt delay, uniformly from `[min, max]`
///
/// Returns `None` when jitter is disabled or both bounds are zero.
pub fn jitter_delay(jitter: &JitterConfig) -> Option<Duration> {
    if !jitter.enabled || jitter.max.is_zero() {
        return None;
    }
    let min = jitter.min.as_millis() as u64;
    let max = (jitter.max.as_millis() as u64).max(min);
    let millis = rand::thread_rng().gen_range(min..=max);
    Some(Duration::from_millis(millis))
}
