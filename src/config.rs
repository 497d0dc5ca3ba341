//! Configuration types for gallery-mirror

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Order in which the worker pool reports outcomes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOrder {
    /// Outcomes arrive as items complete (default)
    #[default]
    Unordered,
    /// Outcomes arrive in input order; completed items wait for slower predecessors
    Ordered,
}

/// Retry behavior for a single item fetch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per item, including the first (default: 3)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed delay between a failed attempt and the next one (default: 5 seconds)
    #[serde(default = "default_retry_backoff", with = "duration_serde")]
    pub retry_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

/// Randomized delay applied before every attempt
///
/// Spreads requests out so that many workers starting together do not hit the
/// remote service in one burst.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// Apply the delay at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower bound of the delay (default: 100 ms)
    #[serde(default = "default_jitter_min", with = "millis_serde")]
    pub min: Duration,

    /// Upper bound of the delay, inclusive (default: 10000 ms)
    #[serde(default = "default_jitter_max", with = "millis_serde")]
    pub max: Duration,
}

impl JitterConfig {
    /// Jitter switched off, for tests and local sources
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min: default_jitter_min(),
            max: default_jitter_max(),
        }
    }
}

/// Remote API settings for the HTTP source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the JSON export API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for a mirroring session
///
/// Defaults are applied once, at construction or deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of items fetched concurrently (default: 32)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Root of the mirrored tree (default: current directory)
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Outcome ordering mode
    #[serde(default)]
    pub dispatch_order: DispatchOrder,

    /// Per-item retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pre-attempt randomized delay
    #[serde(default)]
    pub jitter: JitterConfig,

    /// Remote API settings
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            output_root: default_output_root(),
            dispatch_order: DispatchOrder::default(),
            retry: RetryConfig::default(),
            jitter: JitterConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::config("worker_count", "must be at least 1"));
        }
        if self.retry.retry_count == 0 {
            return Err(Error::config("retry.retry_count", "must be at least 1"));
        }
        if self.jitter.min > self.jitter.max {
            return Err(Error::config(
                "jitter",
                format!(
                    "min ({}ms) exceeds max ({}ms)",
                    self.jitter.min.as_millis(),
                    self.jitter.max.as_millis()
                ),
            ));
        }
        url::Url::parse(&self.source.base_url).map_err(|e| {
            Error::config(
                "source.base_url",
                format!("invalid URL '{}': {}", self.source.base_url, e),
            )
        })?;
        Ok(())
    }
}

fn default_worker_count() -> usize {
    32
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_jitter_min() -> Duration {
    Duration::from_millis(100)
}

fn default_jitter_max() -> Duration {
    Duration::from_millis(10_000)
}

fn default_base_url() -> String {
    "https://faexport.spangle.org.uk".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    concat!("gallery-mirror/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond variant for the jitter bounds
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
