//! Error types for gallery-mirror
//!
//! This module provides the error taxonomy for the library:
//! - [`SourceError`] for a single failed request against a remote source
//! - [`CatalogError`] for a listing page that could not be fetched
//! - [`StorageError`] for directory creation and file write failures
//! - [`FailureReason`] for the terminal reason carried by a failed item
//!
//! Per-item errors never escape a worker: they are converted into a
//! [`FetchOutcome`](crate::types::FetchOutcome) at the item boundary.

use crate::types::{Collection, ItemId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gallery-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gallery-mirror
///
/// Only run-level failures surface through this type. Failures of a single
/// item are reported as outcomes instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_count")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error while building or using the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Neither a token pair nor a cookie header was supplied
    #[error("missing credentials: set COOKIE_A and COOKIE_B")]
    MissingCredentials,

    /// No author identifiers were given
    #[error("no authors specified")]
    NoAuthors,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of a single request against a catalog or item source
///
/// A missing item is not an error: item sources report it as `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Connection, timeout, or other transport-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with an unexpected HTTP status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// A catalog page could not be listed
///
/// Fatal to the enumeration of that collection for that author. It is not
/// retried at the catalog layer.
#[derive(Debug, Clone, Error)]
#[error("failed to list page {page} of {author}'s {collection}: {source}")]
pub struct CatalogError {
    /// Author whose catalog was being listed
    pub author: String,
    /// Collection being listed
    pub collection: Collection,
    /// Zero-based page index that failed
    pub page: u32,
    /// Underlying source failure
    #[source]
    pub source: SourceError,
}

/// Filesystem failures while persisting an item
#[derive(Debug, Error)]
pub enum StorageError {
    /// Creating the item's directory failed
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing a payload or sidecar file failed
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Encoding the metadata sidecar failed
    #[error("failed to encode metadata for {}: {source}", path.display())]
    Encode {
        /// Sidecar path
        path: PathBuf,
        /// Underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// The item record names no usable author directory
    #[error("item {id} has no author to file it under")]
    MissingAuthor {
        /// Item identifier
        id: ItemId,
    },

    /// The item's file locator has no usable final path segment
    #[error("cannot derive a filename from {url:?}")]
    InvalidFilename {
        /// The offending file URL
        url: String,
    },
}

/// Terminal reason recorded for an item that was not persisted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The remote item is absent; no retries were consumed
    NotFound,

    /// Every attempt failed with a retryable error
    Exhausted {
        /// Message of the last observed error
        last_error: String,
    },

    /// Directory creation or file write failed
    Filesystem {
        /// Description of the filesystem failure
        message: String,
    },

    /// The batch was cancelled before this item started
    Cancelled,

    /// The worker running this item terminated abnormally
    WorkerAborted {
        /// Description of the abnormal termination
        message: String,
    },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NotFound => write!(f, "not found"),
            FailureReason::Exhausted { last_error } => {
                write!(f, "retries exhausted: {last_error}")
            }
            FailureReason::Filesystem { message } => write!(f, "filesystem error: {message}"),
            FailureReason::Cancelled => write!(f, "cancelled before start"),
            FailureReason::WorkerAborted { message } => write!(f, "worker aborted: {message}"),
        }
    }
}

impl From<&StorageError> for FailureReason {
    fn from(e: &StorageError) -> Self {
        FailureReason::Filesystem {
            message: e.to_string(),
        }
    }
}
