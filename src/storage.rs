//! Persistence of fetched items into the mirror tree.
//!
//! Layout: `<root>/<author>/<type>/<filename>` for the payload and
//! `<root>/<author>/<type>/<filename>.json` for the metadata sidecar, where
//! `filename` is the last path segment of the item's file locator.
//!
//! Both files are created with `create_new`, so the existence check and the
//! create are one atomic filesystem operation. An existing file is never
//! truncated or overwritten; the two files are checked independently.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;
use crate::types::{AuthoredItem, Collection, ItemId, ItemStats, ItemType};
use crate::utils::{filename_from_url, sanitize_component};

/// Suffix appended to the payload filename for the sidecar
pub const SIDECAR_SUFFIX: &str = ".json";

/// Whether a single file was written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    /// The file was created; carries the number of bytes written
    Written(u64),
    /// A file was already present at the path
    AlreadyExists,
}

/// Result of persisting one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreReport {
    /// Payload file path
    pub payload_path: PathBuf,
    /// Payload file status
    pub payload: WriteStatus,
    /// Sidecar file status
    pub sidecar: WriteStatus,
}

/// Deterministic writer rooted at the mirror's output directory
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a writer rooted at `root`; nothing is touched on disk until `store`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an item lands in: `<root>/<author>/<type>`
    ///
    /// Fails when the author sanitises to nothing, which would otherwise put
    /// the item directly under the root.
    pub fn item_dir(&self, item: &AuthoredItem) -> Result<PathBuf, StorageError> {
        let author = sanitize_component(&item.author);
        if author.is_empty() {
            return Err(StorageError::MissingAuthor { id: item.id });
        }
        Ok(self.root.join(author).join(item.item_type.as_str()))
    }

    /// Full payload path for an item
    pub fn payload_path(&self, item: &AuthoredItem) -> Result<PathBuf, StorageError> {
        let filename =
            filename_from_url(&item.file_url).ok_or_else(|| StorageError::InvalidFilename {
                url: item.file_url.clone(),
            })?;
        Ok(self.item_dir(item)?.join(filename))
    }

    /// Persist payload and sidecar, skipping whichever already exists
    pub async fn store(
        &self,
        item: &AuthoredItem,
        payload: &[u8],
    ) -> Result<StoreReport, StorageError> {
        let payload_path = self.payload_path(item)?;
        let sidecar_path = sidecar_path(&payload_path);

        if let Some(dir) = payload_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let payload_status = write_new(&payload_path, payload).await?;
        match payload_status {
            WriteStatus::Written(bytes) => tracing::debug!(
                item_id = item.id.0,
                path = %payload_path.display(),
                bytes,
                "Wrote payload"
            ),
            WriteStatus::AlreadyExists => tracing::debug!(
                item_id = item.id.0,
                path = %payload_path.display(),
                "Payload already present, skipping"
            ),
        }

        let sidecar = Sidecar::new(item, payload.len() as u64);
        let encoded =
            serde_json::to_vec_pretty(&sidecar).map_err(|source| StorageError::Encode {
                path: sidecar_path.clone(),
                source,
            })?;
        let sidecar_status = write_new(&sidecar_path, &encoded).await?;
        if sidecar_status == WriteStatus::AlreadyExists {
            tracing::debug!(
                item_id = item.id.0,
                path = %sidecar_path.display(),
                "Sidecar already present, skipping"
            );
        }

        Ok(StoreReport {
            payload_path,
            payload: payload_status,
            sidecar: sidecar_status,
        })
    }
}

/// Sidecar path for a payload path: the payload filename plus `.json`
pub fn sidecar_path(payload_path: &Path) -> PathBuf {
    let mut name = payload_path.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Create `path` exclusively and write `bytes` into it
///
/// A partially written file is removed so the next run does not mistake it
/// for a complete one.
async fn write_new(path: &Path, bytes: &[u8]) -> Result<WriteStatus, StorageError> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Ok(WriteStatus::AlreadyExists);
        }
        Err(source) => {
            return Err(StorageError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let written = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(source) = written {
        drop(file);
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
        }
        return Err(StorageError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(WriteStatus::Written(bytes.len() as u64))
}

/// Metadata written next to the payload
///
/// The author is encoded in the directory path and left out here.
#[derive(Debug, Serialize)]
struct Sidecar<'a> {
    id: ItemId,
    title: &'a str,
    #[serde(rename = "type")]
    item_type: ItemType,
    tags: &'a BTreeSet<String>,
    folder: Collection,
    stats: ItemStats,
    thumbnail_url: Option<&'a str>,
    date: Option<String>,
    description: &'a str,
    file_url: &'a str,
    file_size: u64,
    category: &'a str,
    species: &'a str,
    gender: &'a str,
    rating: &'a str,
}

impl<'a> Sidecar<'a> {
    fn new(item: &'a AuthoredItem, file_size: u64) -> Self {
        Self {
            id: item.id,
            title: &item.title,
            item_type: item.item_type,
            tags: &item.tags,
            folder: item.folder,
            stats: item.stats,
            thumbnail_url: item.thumbnail_url.as_deref(),
            date: item.date.map(|d| d.to_rfc3339()),
            description: &item.description,
            file_url: &item.file_url,
            file_size,
            category: &item.category,
            species: &item.species,
            gender: &item.gender,
            rating: &item.rating,
        }
    }
}
