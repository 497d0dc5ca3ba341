//! Configuration helpers for tests running against a mock API server

use std::path::Path;
use std::time::Duration;

use gallery_mirror::{Config, Credentials, JitterConfig, RetryConfig, SourceConfig};

/// Cookie header the mock server expects on API requests
pub const SESSION_COOKIE: &str = "b=test-b; a=test-a";

/// Credentials matching [`SESSION_COOKIE`]
pub fn test_credentials() -> Credentials {
    Credentials::Pair {
        a: "test-a".to_string(),
        b: "test-b".to_string(),
    }
}

/// Fast configuration pointed at a mock server
///
/// Jitter is off and backoff is zero so retries do not slow the suite down.
pub fn test_config(output_root: &Path, base_url: &str) -> Config {
    Config {
        worker_count: 4,
        output_root: output_root.to_path_buf(),
        retry: RetryConfig {
            retry_count: 2,
            retry_backoff: Duration::ZERO,
        },
        jitter: JitterConfig::disabled(),
        source: SourceConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..SourceConfig::default()
        },
        ..Config::default()
    }
}
