//! Catalog enumeration: walk a collection page by page until an empty page.
//!
//! Pages are requested lazily, starting at 0. The first empty page ends the
//! walk and nothing beyond it is requested. A failed page ends the walk with
//! a [`CatalogError`]; listing pages are not retried here.

use futures::stream::{self, Stream, StreamExt};

use crate::error::CatalogError;
use crate::source::CatalogSource;
use crate::types::{Collection, ItemId, ItemStub};

/// One non-empty page of a collection listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogPage {
    /// Zero-based page index
    pub page: u32,
    /// Stubs on the page, in listing order
    pub stubs: Vec<ItemStub>,
}

enum Cursor {
    Next(u32),
    Done,
}

/// Lazily list every non-empty page of `collection` for `author`
///
/// The stream ends after the first empty page, or after yielding the first error.
pub fn pages<'a>(
    source: &'a dyn CatalogSource,
    author: &'a str,
    collection: Collection,
) -> impl Stream<Item = Result<CatalogPage, CatalogError>> + Send + 'a {
    stream::unfold(Cursor::Next(0), move |cursor| async move {
        let Cursor::Next(page) = cursor else {
            return None;
        };

        match source.list_page(author, collection, page).await {
            Ok(stubs) if stubs.is_empty() => {
                tracing::debug!(%author, %collection, page, "Empty page, catalog exhausted");
                None
            }
            Ok(stubs) => {
                tracing::debug!(%author, %collection, page, items = stubs.len(), "Listed page");
                Some((Ok(CatalogPage { page, stubs }), Cursor::Next(page + 1)))
            }
            Err(error) => {
                let err = CatalogError {
                    author: author.to_string(),
                    collection,
                    page,
                    source: error,
                };
                Some((Err(err), Cursor::Done))
            }
        }
    })
}

/// Result of walking one collection
///
/// `ids` holds everything listed before the walk ended, including the pages
/// preceding a failed one.
#[derive(Clone, Debug, Default)]
pub struct Listing {
    /// Item ids in page order, duplicates included
    pub ids: Vec<ItemId>,
    /// The page error that ended the walk, if any
    pub error: Option<CatalogError>,
}

/// Walk `collection` for `author`, calling `on_page` for every non-empty page
pub async fn list_collection<F>(
    source: &dyn CatalogSource,
    author: &str,
    collection: Collection,
    mut on_page: F,
) -> Listing
where
    F: FnMut(&CatalogPage),
{
    tracing::info!(%author, %collection, "Getting item ids");

    let mut listing = Listing::default();
    let mut walk = Box::pin(pages(source, author, collection));
    while let Some(page) = walk.next().await {
        match page {
            Ok(page) => {
                on_page(&page);
                listing.ids.extend(page.stubs.into_iter().map(|stub| stub.id));
            }
            Err(e) => listing.error = Some(e),
        }
    }

    tracing::debug!(%author, %collection, total = listing.ids.len(), "Catalog enumerated");
    listing
}

/// Collect every item id of `collection` for `author`, in page order
///
/// Duplicates are kept; deduplication happens when the work batch is built.
/// A page error fails the whole collection.
pub async fn enumerate(
    source: &dyn CatalogSource,
    author: &str,
    collection: Collection,
) -> Result<Vec<ItemId>, CatalogError> {
    let listing = list_collection(source, author, collection, |_| {}).await;
    match listing.error {
        Some(e) => Err(e),
        None => Ok(listing.ids),
    }
}
