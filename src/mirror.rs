//! Session orchestration: enumerate, deduplicate, dispatch, summarize.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::ItemFetcher;
use crate::pool::WorkerPool;
use crate::source::{CatalogSource, Credentials, HttpSource, ItemSource};
use crate::types::{Collection, Event, ItemId, RunSummary, WorkBatch};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// One mirroring session
///
/// Owns the configuration and the source handles for the lifetime of the
/// process. The sources are shared read-only with every worker.
pub struct Mirror {
    config: Arc<Config>,
    catalog: Arc<dyn CatalogSource>,
    pool: WorkerPool,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Mirror {
    /// Create a session over explicit sources
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogSource>,
        items: Arc<dyn ItemSource>,
    ) -> Result<Self> {
        config.validate()?;

        let cancel_token = CancellationToken::new();
        let fetcher = Arc::new(ItemFetcher::from_config(items, &config));
        let pool = WorkerPool::new(fetcher, config.worker_count, config.dispatch_order)
            .with_cancellation(cancel_token.clone());
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            catalog,
            pool,
            event_tx,
            cancel_token,
        })
    }

    /// Create a session talking to the HTTP export API
    pub fn with_http(config: Config, credentials: &Credentials) -> Result<Self> {
        let source = Arc::new(HttpSource::new(&config.source, credentials)?);
        Self::new(config, source.clone(), source)
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the session from starting new items when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Mirror every author in turn
    ///
    /// Fails only when `authors` is empty; per-author problems are reported in
    /// each summary.
    pub async fn run_all(&self, authors: &[String]) -> Result<Vec<RunSummary>> {
        if authors.is_empty() {
            return Err(Error::NoAuthors);
        }

        let mut summaries = Vec::with_capacity(authors.len());
        for author in authors {
            if self.cancel_token.is_cancelled() {
                tracing::warn!(%author, "Session cancelled, skipping remaining authors");
                break;
            }
            summaries.push(self.run(author).await);
        }
        Ok(summaries)
    }

    /// Mirror one author's gallery and scraps
    pub async fn run(&self, author: &str) -> RunSummary {
        tracing::info!(%author, "Mirroring author");
        let mut summary = RunSummary {
            author: author.to_string(),
            ..RunSummary::default()
        };

        let mut catalogs = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let ids = self.enumerate(author, collection, &mut summary).await;
            match collection {
                Collection::Gallery => summary.gallery_listed = ids.len(),
                Collection::Scraps => summary.scraps_listed = ids.len(),
            }
            catalogs.push(ids);
        }

        let batch = WorkBatch::from_catalogs(catalogs);
        summary.batch_size = batch.len();
        tracing::info!(%author, items = batch.len(), "Work batch ready");
        self.emit(Event::BatchReady {
            author: author.to_string(),
            items: batch.len(),
        });

        self.pool
            .dispatch_with(batch, |outcome| {
                summary.record(outcome);
                self.emit(Event::ItemFinished {
                    author: author.to_string(),
                    id: outcome.id(),
                    status: outcome.status(),
                });
            })
            .await;

        tracing::info!(
            %author,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            bytes = summary.bytes_written,
            "Finished author"
        );
        self.emit(Event::RunComplete {
            summary: summary.clone(),
        });
        summary
    }

    /// List one collection, emitting a page event per page
    ///
    /// Unlike [`catalog::enumerate`], ids from pages listed before a page
    /// error are kept. The error ends this collection only.
    async fn enumerate(
        &self,
        author: &str,
        collection: Collection,
        summary: &mut RunSummary,
    ) -> Vec<ItemId> {
        let listing = catalog::list_collection(self.catalog.as_ref(), author, collection, |page| {
            self.emit(Event::CatalogPage {
                author: author.to_string(),
                collection,
                page: page.page,
                items: page.stubs.len(),
            });
        })
        .await;

        if let Some(e) = listing.error {
            tracing::error!(%author, %collection, error = %e, "Catalog enumeration stopped");
            self.emit(Event::CatalogFailed {
                author: author.to_string(),
                collection,
                error: e.to_string(),
            });
            summary.catalog_errors.push(e.to_string());
        }
        listing.ids
    }

    fn emit(&self, event: Event) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }
}
