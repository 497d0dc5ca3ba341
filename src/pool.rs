//! Worker pool: fan a work batch out across a fixed number of concurrent workers.
//!
//! Each identifier runs fetch-then-persist on its own spawned task, so one
//! item's failure (or panic) is isolated from its siblings. At most
//! `worker_count` items are in flight; a new item starts only when a slot
//! frees up. The pool returns once every identifier has produced exactly one
//! [`FetchOutcome`].
//!
//! Outcomes are folded one completion at a time on the dispatching task; no
//! worker touches the collected results.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::DispatchOrder;
use crate::error::FailureReason;
use crate::fetcher::ItemFetcher;
use crate::types::{FetchOutcome, ItemId, WorkBatch};

/// Dispatches work batches onto a bounded set of workers
#[derive(Clone)]
pub struct WorkerPool {
    fetcher: Arc<ItemFetcher>,
    worker_count: usize,
    order: DispatchOrder,
    cancel_token: CancellationToken,
}

impl WorkerPool {
    /// Create a pool running `fetcher` on at most `worker_count` items at once
    pub fn new(fetcher: Arc<ItemFetcher>, worker_count: usize, order: DispatchOrder) -> Self {
        Self {
            fetcher,
            worker_count: worker_count.max(1),
            order,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Use `token` to stop submitting new items
    ///
    /// Items already in flight run to completion; items not yet started are
    /// reported as [`FailureReason::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Configured number of workers
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run every identifier in `batch` and collect one outcome per identifier
    pub async fn dispatch(&self, batch: WorkBatch) -> Vec<FetchOutcome> {
        self.dispatch_with(batch, |_| {}).await
    }

    /// Like [`dispatch`](Self::dispatch), calling `on_outcome` as each item completes
    pub async fn dispatch_with<F>(&self, batch: WorkBatch, mut on_outcome: F) -> Vec<FetchOutcome>
    where
        F: FnMut(&FetchOutcome),
    {
        let total = batch.len();
        tracing::info!(
            items = total,
            workers = self.worker_count,
            order = ?self.order,
            "Dispatching work batch"
        );

        let tasks = stream::iter(batch.into_ids()).map(|id| self.run_one(id));

        let mut outcomes = Vec::with_capacity(total);
        match self.order {
            DispatchOrder::Unordered => {
                let mut completed = tasks.buffer_unordered(self.worker_count);
                while let Some(outcome) = completed.next().await {
                    on_outcome(&outcome);
                    outcomes.push(outcome);
                }
            }
            DispatchOrder::Ordered => {
                let mut completed = tasks.buffered(self.worker_count);
                while let Some(outcome) = completed.next().await {
                    on_outcome(&outcome);
                    outcomes.push(outcome);
                }
            }
        }

        tracing::debug!(outcomes = outcomes.len(), "Work batch joined");
        outcomes
    }

    /// Spawn one item onto its own task, turning cancellation and panics into outcomes
    ///
    /// The cancellation check runs when the item is pulled from the queue, which
    /// is when a worker slot has just freed up.
    fn run_one(&self, id: ItemId) -> impl std::future::Future<Output = FetchOutcome> + use<> {
        let fetcher = Arc::clone(&self.fetcher);
        let cancelled = self.cancel_token.is_cancelled();

        async move {
            if cancelled {
                tracing::debug!(item_id = id.0, "Batch cancelled, not starting item");
                return FetchOutcome::Failed {
                    id,
                    reason: FailureReason::Cancelled,
                    attempts: 0,
                };
            }

            match tokio::spawn(async move { fetcher.fetch(id).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(item_id = id.0, error = %e, "Worker terminated abnormally");
                    FetchOutcome::Failed {
                        id,
                        reason: FailureReason::WorkerAborted {
                            message: e.to_string(),
                        },
                        attempts: 0,
                    }
                }
            }
        }
    }
}
