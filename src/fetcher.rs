//! Item fetcher: jittered, bounded-retry fetch of one item, then hand-off to storage.
//!
//! From the caller's perspective fetch and persist are a single unit of work:
//! [`ItemFetcher::fetch`] always returns a [`FetchOutcome`] and never an error.

use std::sync::Arc;

use crate::config::{Config, JitterConfig, RetryConfig};
use crate::error::FailureReason;
use crate::retry::{Attempted, attempt_with_retry};
use crate::source::{ItemSource, RemoteItem};
use crate::storage::{Storage, WriteStatus};
use crate::types::{FetchOutcome, ItemId, SkipReason};

/// Fetches single items and persists them
///
/// Shared read-only by every worker; holds no per-item state.
pub struct ItemFetcher {
    source: Arc<dyn ItemSource>,
    storage: Storage,
    retry: RetryConfig,
    jitter: JitterConfig,
}

impl ItemFetcher {
    /// Create a fetcher with explicit retry and jitter settings
    pub fn new(
        source: Arc<dyn ItemSource>,
        storage: Storage,
        retry: RetryConfig,
        jitter: JitterConfig,
    ) -> Self {
        Self {
            source,
            storage,
            retry,
            jitter,
        }
    }

    /// Create a fetcher from the session configuration
    pub fn from_config(source: Arc<dyn ItemSource>, config: &Config) -> Self {
        Self::new(
            source,
            Storage::new(config.output_root.clone()),
            config.retry.clone(),
            config.jitter.clone(),
        )
    }

    /// Storage the fetcher writes into
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Fetch `id` with retries and persist it
    pub async fn fetch(&self, id: ItemId) -> FetchOutcome {
        let attempted = attempt_with_retry(&self.retry, &self.jitter, |attempt| {
            tracing::debug!(item_id = id.0, attempt, "Fetching item");
            self.source.get_item(id)
        })
        .await;

        match attempted {
            Attempted::Found { value, attempts } => self.persist(value, attempts).await,
            Attempted::NotFound { attempts } => {
                tracing::warn!(item_id = id.0, "Item not found");
                FetchOutcome::Failed {
                    id,
                    reason: FailureReason::NotFound,
                    attempts,
                }
            }
            Attempted::Exhausted {
                last_error,
                attempts,
            } => {
                tracing::error!(item_id = id.0, attempts, error = %last_error, "Failed to fetch item");
                FetchOutcome::Failed {
                    id,
                    reason: FailureReason::Exhausted {
                        last_error: last_error.to_string(),
                    },
                    attempts,
                }
            }
        }
    }

    async fn persist(&self, remote: RemoteItem, attempts: u32) -> FetchOutcome {
        let RemoteItem { item, payload } = remote;
        tracing::debug!(
            item_id = item.id.0,
            title = %item.title,
            author = %item.author,
            kib = %format!("{:.3}", payload.len() as f64 / 1024.0),
            "Fetched item"
        );

        match self.storage.store(&item, &payload).await {
            Ok(report) => match report.payload {
                WriteStatus::Written(bytes_written) => FetchOutcome::Success {
                    item,
                    bytes_written,
                },
                WriteStatus::AlreadyExists => FetchOutcome::Skipped {
                    id: item.id,
                    reason: SkipReason::AlreadyExists,
                },
            },
            Err(e) => {
                tracing::error!(item_id = item.id.0, error = %e, "Failed to persist item");
                FetchOutcome::Failed {
                    id: item.id,
                    reason: FailureReason::from(&e),
                    attempts,
                }
            }
        }
    }
}
