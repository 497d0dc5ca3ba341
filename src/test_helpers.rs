//! Shared test helpers: in-memory sources and a fast configuration.

use crate::config::{Config, JitterConfig, RetryConfig};
use crate::error::SourceError;
use crate::source::{CatalogSource, ItemSource, RemoteItem};
use crate::types::{AuthoredItem, Collection, ItemId, ItemStats, ItemStub, ItemType};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Config with jitter off and zero backoff, writing under `root`
pub(crate) fn fast_config(root: &Path) -> Config {
    Config {
        worker_count: 4,
        output_root: root.to_path_buf(),
        retry: RetryConfig {
            retry_count: 3,
            retry_backoff: Duration::ZERO,
        },
        jitter: JitterConfig::disabled(),
        ..Config::default()
    }
}

/// A fetchable item with a unique file locator per id
pub(crate) fn remote_item(id: u64, payload: &[u8]) -> RemoteItem {
    RemoteItem {
        item: AuthoredItem {
            id: ItemId(id),
            title: format!("Item {id}"),
            author: "someartist".to_string(),
            item_type: ItemType::Image,
            tags: ["tag".to_string()].into_iter().collect(),
            folder: Collection::Gallery,
            rating: "General".to_string(),
            category: "Artwork".to_string(),
            species: "Unspecified".to_string(),
            gender: "Any".to_string(),
            description: String::new(),
            date: None,
            file_url: format!("https://d.example.net/art/someartist/{id}/{id}.file.png"),
            thumbnail_url: None,
            stats: ItemStats::default(),
            file_size: payload.len() as u64,
        },
        payload: payload.to_vec(),
    }
}

/// Scripted behavior for one item id
#[derive(Clone, Debug)]
pub(crate) enum ItemBehavior {
    /// Fail with a transport error on every attempt
    AlwaysFail,
    /// Fail with a transport error this many times, then serve the item
    FailTimes(u32),
    /// Fail with the given error on every attempt
    Error(SourceError),
    /// Sleep before serving the item
    Delay(Duration),
    /// Panic inside the source call
    Panic,
}

/// In-memory item source with per-id attempt counters
#[derive(Default)]
pub(crate) struct FakeItemSource {
    items: Mutex<HashMap<ItemId, RemoteItem>>,
    behaviors: Mutex<HashMap<ItemId, ItemBehavior>>,
    attempts: Mutex<HashMap<ItemId, u32>>,
}

impl FakeItemSource {
    pub(crate) fn with_items(items: impl IntoIterator<Item = RemoteItem>) -> Self {
        let source = Self::default();
        {
            let mut map = source.items.lock().unwrap();
            for remote in items {
                map.insert(remote.item.id, remote);
            }
        }
        source
    }

    pub(crate) fn set(&self, id: ItemId, behavior: ItemBehavior) {
        self.behaviors.lock().unwrap().insert(id, behavior);
    }

    pub(crate) fn attempts(&self, id: ItemId) -> u32 {
        self.attempts.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub(crate) fn total_attempts(&self) -> u32 {
        self.attempts.lock().unwrap().values().sum()
    }
}

#[async_trait::async_trait]
impl ItemSource for FakeItemSource {
    async fn get_item(&self, id: ItemId) -> Result<Option<RemoteItem>, SourceError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(id).or_insert(0);
            *n += 1;
            *n
        };
        let behavior = self.behaviors.lock().unwrap().get(&id).cloned();

        match behavior {
            Some(ItemBehavior::AlwaysFail) => {
                return Err(SourceError::Transport(format!("connection reset ({id})")));
            }
            Some(ItemBehavior::FailTimes(n)) if attempt <= n => {
                return Err(SourceError::Transport(format!("timeout ({id})")));
            }
            Some(ItemBehavior::Error(e)) => return Err(e),
            Some(ItemBehavior::Delay(d)) => tokio::time::sleep(d).await,
            Some(ItemBehavior::Panic) => panic!("source exploded for {id}"),
            _ => {}
        }

        Ok(self.items.lock().unwrap().get(&id).cloned())
    }
}

/// In-memory catalog: fixed pages per (author, collection), recording every query
#[derive(Default)]
pub(crate) struct FakeCatalog {
    pages: Mutex<HashMap<(String, Collection), Vec<Vec<u64>>>>,
    failing: Mutex<HashMap<(String, Collection), u32>>,
    queries: Mutex<Vec<(String, Collection, u32)>>,
}

impl FakeCatalog {
    /// Serve `pages` for the collection; any page past the end is empty
    pub(crate) fn with_pages(
        self,
        author: &str,
        collection: Collection,
        pages: Vec<Vec<u64>>,
    ) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((author.to_string(), collection), pages);
        self
    }

    /// Fail with a transport error when `page` of the collection is requested
    pub(crate) fn failing_at(self, author: &str, collection: Collection, page: u32) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert((author.to_string(), collection), page);
        self
    }

    pub(crate) fn queries(&self) -> Vec<(String, Collection, u32)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for FakeCatalog {
    async fn list_page(
        &self,
        author: &str,
        collection: Collection,
        page: u32,
    ) -> Result<Vec<ItemStub>, SourceError> {
        self.queries
            .lock()
            .unwrap()
            .push((author.to_string(), collection, page));

        let key = (author.to_string(), collection);
        if self.failing.lock().unwrap().get(&key) == Some(&page) {
            return Err(SourceError::Transport("listing unavailable".to_string()));
        }

        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&key)
            .and_then(|pages| pages.get(page as usize))
            .map(|ids| ids.iter().map(|id| ItemStub::from(ItemId(*id))).collect())
            .unwrap_or_default())
    }
}
