//! # gallery-mirror
//!
//! Bulk mirroring of an author's published items into a local directory tree.
//!
//! ## Design Philosophy
//!
//! gallery-mirror is designed to be:
//! - **Bounded** - A fixed pool of workers, each fetching one item at a time
//! - **Isolated** - One item's failure never aborts its siblings
//! - **Idempotent** - Existing files are never overwritten, so re-runs are cheap
//! - **Pluggable** - The remote site is reached through two small traits
//!
//! ## Pipeline
//!
//! ```text
//! Mirror::run(author)
//!   -> catalog::pages (gallery, scraps)   page 0, 1, ... until an empty page
//!   -> WorkBatch                          deduplicated, frozen
//!   -> WorkerPool::dispatch               worker_count concurrent items
//!        -> ItemFetcher::fetch            jitter, bounded retry
//!        -> Storage::store                <root>/<author>/<type>/<file> + .json
//!   -> RunSummary                         succeeded / skipped / failed
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use gallery_mirror::{Config, Credentials, Mirror};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         worker_count: 8,
//!         output_root: "mirror".into(),
//!         ..Default::default()
//!     };
//!     let credentials = Credentials::from_env()?;
//!     let mirror = Mirror::with_http(config, &credentials)?;
//!
//!     let summary = mirror.run("someartist").await;
//!     println!(
//!         "{} written, {} skipped, {} failed",
//!         summary.succeeded, summary.skipped, summary.failed
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Catalog enumeration
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-item fetch with retry
pub mod fetcher;
/// Session orchestration
pub mod mirror;
/// Bounded worker pool
pub mod pool;
/// Attempt state machine with jitter and linear backoff
pub mod retry;
/// Remote catalog and item sources
pub mod source;
/// On-disk persistence
pub mod storage;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DispatchOrder, JitterConfig, RetryConfig, SourceConfig};
pub use error::{CatalogError, Error, FailureReason, Result, SourceError, StorageError};
pub use fetcher::ItemFetcher;
pub use mirror::Mirror;
pub use pool::WorkerPool;
pub use source::{CatalogSource, Credentials, HttpSource, ItemSource, RemoteItem};
pub use storage::Storage;
pub use types::{
    AuthoredItem, Collection, Event, FetchOutcome, ItemId, ItemStats, ItemStub, ItemType,
    OutcomeStatus, RunSummary, SkipReason, WorkBatch,
};

/// Exit status used when a second signal forces the process down
const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` when a termination signal arrives.
///
/// Spawns a background task and returns immediately. Cancelling stops new
/// items from starting; items already in flight finish normally. A second
/// signal exits the process at once, without waiting for in-flight items.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    tokio::spawn(watch_signals(token, wait_for_signal, || {
        tracing::error!("Second signal received, exiting without waiting for in-flight items");
        std::process::exit(FORCED_EXIT_CODE);
    }));
}

/// Cancel `token` on the first signal, call `force_exit` on the next one
///
/// Once the token is cancelled (by a signal or by the caller) the signal
/// handlers stay installed, so the next signal must be acted on here.
async fn watch_signals<S, Fut, X>(
    token: tokio_util::sync::CancellationToken,
    mut next_signal: S,
    force_exit: X,
) where
    S: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
    X: FnOnce(),
{
    tokio::select! {
        _ = next_signal() => {
            tracing::warn!("Stopping after in-flight items finish, signal again to exit now");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
    next_signal().await;
    force_exit();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Notify, oneshot};
    use tokio_util::sync::CancellationToken;

    type SignalFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    /// Each call waits for one `notify_one` on `notify`
    fn fake_signals(notify: Arc<Notify>) -> impl FnMut() -> SignalFuture + Send {
        move || {
            let notify = notify.clone();
            Box::pin(async move { notify.notified().await })
        }
    }

    #[tokio::test]
    async fn first_signal_cancels_and_second_forces_exit() {
        let token = CancellationToken::new();
        let signals = Arc::new(Notify::new());
        let (exit_tx, mut exit_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_signals(token.clone(), fake_signals(signals.clone()), move || {
            let _ = exit_tx.send(());
        }));

        signals.notify_one();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(exit_rx.try_recv().is_err(), "one signal must only cancel");

        signals.notify_one();
        tokio::time::timeout(Duration::from_secs(1), &mut exit_rx)
            .await
            .unwrap()
            .unwrap();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn signal_after_external_cancel_forces_exit() {
        let token = CancellationToken::new();
        let signals = Arc::new(Notify::new());
        let (exit_tx, mut exit_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_signals(token.clone(), fake_signals(signals.clone()), move || {
            let _ = exit_tx.send(());
        }));

        token.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(exit_rx.try_recv().is_err(), "cancelling alone must not exit");

        signals.notify_one();
        tokio::time::timeout(Duration::from_secs(1), &mut exit_rx)
            .await
            .unwrap()
            .unwrap();
        watcher.await.unwrap();
    }
}
