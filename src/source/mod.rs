//! Remote sources consumed by the pipeline.
//!
//! The core only sees two capabilities:
//! - [`CatalogSource`] - one page of a paginated collection listing
//! - [`ItemSource`] - one item's metadata record plus its binary payload
//!
//! [`HttpSource`] implements both against a JSON export API. Tests provide
//! in-memory implementations.

mod http;

pub use http::HttpSource;

use crate::error::{Error, Result, SourceError};
use crate::types::{AuthoredItem, Collection, ItemId, ItemStub};

/// A fetched item: its metadata record and raw payload bytes
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteItem {
    /// Metadata record
    pub item: AuthoredItem,
    /// Binary payload
    pub payload: Vec<u8>,
}

/// Paginated listing of an author's collections.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// List one zero-based page of `collection` for `author`.
    ///
    /// An empty list marks the end of the collection.
    async fn list_page(
        &self,
        author: &str,
        collection: Collection,
        page: u32,
    ) -> std::result::Result<Vec<ItemStub>, SourceError>;
}

/// Single-item fetch.
#[async_trait::async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch the record and payload for `id`.
    ///
    /// Returns `Ok(None)` when the item (or its payload) does not exist.
    async fn get_item(&self, id: ItemId) -> std::result::Result<Option<RemoteItem>, SourceError>;
}

/// Environment variable holding the first session token
pub const COOKIE_A_VAR: &str = "COOKIE_A";
/// Environment variable holding the second session token
pub const COOKIE_B_VAR: &str = "COOKIE_B";

/// Authenticated session credentials
///
/// Supplied once at startup and treated as immutable for the whole run.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// The two session cookie tokens
    Pair {
        /// Value of the `a` cookie
        a: String,
        /// Value of the `b` cookie
        b: String,
    },
    /// A pre-built cookie header value, used verbatim
    Header(String),
}

impl Credentials {
    /// Build a token pair, rejecting blank values
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Result<Self> {
        let (a, b) = (a.into(), b.into());
        if a.trim().is_empty() || b.trim().is_empty() {
            return Err(Error::MissingCredentials);
        }
        Ok(Credentials::Pair { a, b })
    }

    /// Read `COOKIE_A` / `COOKIE_B` from the process environment
    pub fn from_env() -> Result<Self> {
        let a = std::env::var(COOKIE_A_VAR).map_err(|_| Error::MissingCredentials)?;
        let b = std::env::var(COOKIE_B_VAR).map_err(|_| Error::MissingCredentials)?;
        Self::pair(a, b)
    }

    /// Value for the cookie header sent with every request
    pub fn cookie_header(&self) -> String {
        match self {
            Credentials::Pair { a, b } => format!("b={b}; a={a}"),
            Credentials::Header(raw) => raw.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Pair { .. } => f.write_str("Credentials::Pair { .. }"),
            Credentials::Header(_) => f.write_str("Credentials::Header(..)"),
        }
    }
}
