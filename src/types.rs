//! Core types for gallery-mirror

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::FailureReason;

/// Unique identifier of an item on the remote site
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A named, paginated listing of an author's items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// The author's primary gallery
    #[default]
    Gallery,
    /// The secondary "scraps" bucket
    Scraps,
}

impl Collection {
    /// Every collection, in the order the orchestrator enumerates them
    pub const ALL: [Collection; 2] = [Collection::Gallery, Collection::Scraps];

    /// Lowercase name used in URLs and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Gallery => "gallery",
            Collection::Scraps => "scraps",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of content an item carries
///
/// Also names the directory the item is stored under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Image artwork
    Image,
    /// Stories, poetry and other writing
    Text,
    /// Music and audio
    Audio,
    /// Anything the site does not classify as the above
    #[default]
    Other,
}

impl ItemType {
    /// Lowercase name used as the on-disk directory
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Image => "image",
            ItemType::Text => "text",
            ItemType::Audio => "audio",
            ItemType::Other => "other",
        }
    }

    /// Parse a site-defined type label, falling back to [`ItemType::Other`]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "image" | "artwork" | "photo" => ItemType::Image,
            "text" | "story" | "writing" | "poetry" => ItemType::Text,
            "audio" | "music" => ItemType::Audio,
            _ => ItemType::Other,
        }
    }

    /// Guess the type from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "tif" | "tiff" => ItemType::Image,
            "txt" | "rtf" | "doc" | "docx" | "odt" | "pdf" => ItemType::Text,
            "mp3" | "wav" | "ogg" | "flac" | "mid" | "midi" | "m4a" => ItemType::Audio,
            _ => ItemType::Other,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement counters for an item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    /// View count
    pub views: u64,
    /// Favorite count
    pub favorites: u64,
    /// Comment count
    pub comments: u64,
}

/// One entry of a catalog listing page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStub {
    /// Item identifier
    pub id: ItemId,
    /// Title, when the listing carries it
    #[serde(default)]
    pub title: Option<String>,
}

impl From<ItemId> for ItemStub {
    fn from(id: ItemId) -> Self {
        Self { id, title: None }
    }
}

/// A fetched item's metadata record
///
/// Constructed once by an item source and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthoredItem {
    /// Item identifier
    pub id: ItemId,
    /// Title
    pub title: String,
    /// Author identifier
    pub author: String,
    /// Content kind
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Keyword tags
    pub tags: BTreeSet<String>,
    /// Collection the item was published in
    pub folder: Collection,
    /// Maturity rating
    pub rating: String,
    /// Site category
    pub category: String,
    /// Species label
    pub species: String,
    /// Gender label
    pub gender: String,
    /// Author-supplied description
    pub description: String,
    /// Publication timestamp
    pub date: Option<DateTime<Utc>>,
    /// Locator of the binary payload
    pub file_url: String,
    /// Locator of the thumbnail
    pub thumbnail_url: Option<String>,
    /// Engagement counters
    pub stats: ItemStats,
    /// Payload size in bytes
    pub file_size: u64,
}

/// The frozen, deduplicated set of identifiers scheduled for one author
///
/// Iteration follows first-seen order, so the ordered dispatch mode has a
/// well-defined input order to preserve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkBatch {
    ids: Vec<ItemId>,
}

impl WorkBatch {
    /// Union several identifier lists, keeping the first occurrence of each id
    pub fn from_catalogs<I, C>(catalogs: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = ItemId>,
    {
        catalogs.into_iter().flatten().collect()
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the batch holds no identifiers
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True when `id` is part of the batch
    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// Identifiers in first-seen order
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Consume the batch, yielding its identifiers
    pub fn into_ids(self) -> Vec<ItemId> {
        self.ids
    }
}

impl FromIterator<ItemId> for WorkBatch {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        let ids = iter.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { ids }
    }
}

/// Why an item was not written
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The payload file is already present at its target path
    AlreadyExists,
}

/// Result of fetching and persisting one item
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// Payload written to disk
    Success {
        /// The persisted item
        item: AuthoredItem,
        /// Bytes written for the payload
        bytes_written: u64,
    },
    /// Payload already present; nothing overwritten
    Skipped {
        /// Item identifier
        id: ItemId,
        /// Why the write was skipped
        reason: SkipReason,
    },
    /// Item not persisted
    Failed {
        /// Item identifier
        id: ItemId,
        /// Terminal failure reason
        reason: FailureReason,
        /// Attempts made against the item source
        attempts: u32,
    },
}

impl FetchOutcome {
    /// Identifier this outcome belongs to
    pub fn id(&self) -> ItemId {
        match self {
            FetchOutcome::Success { item, .. } => item.id,
            FetchOutcome::Skipped { id, .. } | FetchOutcome::Failed { id, .. } => *id,
        }
    }

    /// Coarse classification used for counting and events
    pub fn status(&self) -> OutcomeStatus {
        match self {
            FetchOutcome::Success { .. } => OutcomeStatus::Success,
            FetchOutcome::Skipped { .. } => OutcomeStatus::Skipped,
            FetchOutcome::Failed { .. } => OutcomeStatus::Failed,
        }
    }
}

/// Coarse status of a [`FetchOutcome`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Written
    Success,
    /// Already present
    Skipped,
    /// Not persisted
    Failed,
}

/// Per-author summary of one run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Author that was mirrored
    pub author: String,
    /// Identifiers listed in the gallery (before deduplication)
    pub gallery_listed: usize,
    /// Identifiers listed in scraps (before deduplication)
    pub scraps_listed: usize,
    /// Distinct identifiers dispatched
    pub batch_size: usize,
    /// Items written
    pub succeeded: usize,
    /// Items already present
    pub skipped: usize,
    /// Items not persisted
    pub failed: usize,
    /// Payload bytes written
    pub bytes_written: u64,
    /// Collections whose enumeration stopped on a page error
    pub catalog_errors: Vec<String>,
}

impl RunSummary {
    /// Fold one outcome into the counters
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Success { bytes_written, .. } => {
                self.succeeded += 1;
                self.bytes_written += bytes_written;
            }
            FetchOutcome::Skipped { .. } => self.skipped += 1,
            FetchOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Total outcomes recorded
    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// True when nothing failed and every collection was listed completely
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.catalog_errors.is_empty()
    }
}

/// Progress events broadcast by a [`Mirror`](crate::Mirror)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A catalog page was listed
    CatalogPage {
        /// Author being listed
        author: String,
        /// Collection being listed
        collection: Collection,
        /// Zero-based page index
        page: u32,
        /// Stubs on the page
        items: usize,
    },

    /// Listing a collection stopped on an error
    CatalogFailed {
        /// Author being listed
        author: String,
        /// Collection being listed
        collection: Collection,
        /// Error message
        error: String,
    },

    /// The work batch is frozen and about to be dispatched
    BatchReady {
        /// Author being mirrored
        author: String,
        /// Distinct identifiers in the batch
        items: usize,
    },

    /// One item produced its outcome
    ItemFinished {
        /// Author being mirrored
        author: String,
        /// Item identifier
        id: ItemId,
        /// Outcome status
        status: OutcomeStatus,
    },

    /// The author's run finished
    RunComplete {
        /// Final counters
        summary: RunSummary,
    },
}
