//! Command-line entry point: mirror one or more authors into a directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gallery_mirror::{Config, Credentials, DispatchOrder, Mirror, cancel_on_signal};
use tracing_subscriber::EnvFilter;

/// Mirror an author's gallery and scraps into a local directory tree
#[derive(Debug, Parser)]
#[command(name = "gallery-mirror", version, about)]
struct Cli {
    /// Authors to mirror
    #[arg(short = 'a', long = "artists", num_args = 1..)]
    artists: Vec<String>,

    /// Number of parallel downloads (default: 32)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Output directory (default: current directory)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Attempts per item (default: 3)
    #[arg(long = "retries")]
    retries: Option<u32>,

    /// Seconds to wait between attempts (default: 5)
    #[arg(long = "retry-backoff")]
    retry_backoff: Option<u64>,

    /// Skip the randomized delay before each attempt
    #[arg(long = "no-jitter")]
    no_jitter: bool,

    /// Report outcomes in catalog order instead of completion order
    #[arg(long = "ordered")]
    ordered: bool,

    /// JSON configuration file; flags override its values
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> gallery_mirror::Result<(Config, Vec<String>)> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(jobs) = self.jobs {
            config.worker_count = jobs;
        }
        if let Some(output) = self.output {
            config.output_root = output;
        }
        if let Some(retries) = self.retries {
            config.retry.retry_count = retries;
        }
        if let Some(secs) = self.retry_backoff {
            config.retry.retry_backoff = std::time::Duration::from_secs(secs);
        }
        if self.no_jitter {
            config.jitter.enabled = false;
        }
        if self.ordered {
            config.dispatch_order = DispatchOrder::Ordered;
        }
        config.validate()?;
        Ok((config, self.artists))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "gallery_mirror=debug"
    } else {
        "gallery_mirror=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may live in a .env file next to the working directory
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.artists.is_empty() {
        tracing::error!("No artists specified, pass at least one with -a");
        return ExitCode::FAILURE;
    }

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!(error = %e, "No a and b cookies specified");
            return ExitCode::FAILURE;
        }
    };

    let (config, artists) = match cli.into_config() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(?artists, workers = config.worker_count, "Starting");
    let mirror = match Mirror::with_http(config, &credentials) {
        Ok(mirror) => mirror,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start session");
            return ExitCode::FAILURE;
        }
    };
    cancel_on_signal(mirror.cancellation_token());

    match mirror.run_all(&artists).await {
        Ok(summaries) => {
            for summary in &summaries {
                tracing::info!(
                    author = %summary.author,
                    listed = summary.gallery_listed + summary.scraps_listed,
                    batch = summary.batch_size,
                    succeeded = summary.succeeded,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    catalog_errors = summary.catalog_errors.len(),
                    "Summary"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
