//! Command-line interface definitions.
//!
//! All options can also be provided through environment variables (a `.env`
//! file in the working directory is loaded first).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::transport::RetryPolicy;

/// Command-line arguments for the job posting scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape every default category, reading queries_*.json from ./config
/// vagas_scraper --config-dir ./config --output-dir ./data
///
/// # Only the law category, without publishing to Firebase
/// vagas_scraper -c direito --no-sync
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the `queries_<category>.json` files
    #[arg(long, env = "VAGAS_CONFIG_DIR", default_value = ".")]
    pub config_dir: PathBuf,

    /// Directory receiving the `db_<category>.json` files
    #[arg(short, long, env = "VAGAS_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Category to scrape (repeatable); defaults to tecnologia and direito
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Firebase Realtime Database URL; sync is disabled when absent
    #[arg(long, env = "FIREBASE_DB_URL")]
    pub firebase_db_url: Option<String>,

    /// Firebase auth token appended as `?auth=`
    #[arg(long, env = "FIREBASE_AUTH_TOKEN", hide_env_values = true)]
    pub firebase_auth_token: Option<String>,

    /// Skip publishing to the remote database
    #[arg(long)]
    pub no_sync: bool,

    /// Minimum random delay before each request, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub min_delay_ms: u64,

    /// Maximum random delay before each request, in milliseconds
    #[arg(long, default_value_t = 3500)]
    pub max_delay_ms: u64,

    /// Fail immediately on 4xx responses other than 429 instead of retrying
    #[arg(long)]
    pub no_retry_client_errors: bool,
}

impl Cli {
    /// Default retry policy with the delay and client-error overrides applied.
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default().with_human_delay(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        );
        policy.retry_client_errors = !self.no_retry_client_errors;
        policy
    }

    /// Database URL to sync to, unless sync is disabled.
    pub fn sync_target(&self) -> Option<&str> {
        if self.no_sync {
            None
        } else {
            self.firebase_db_url.as_deref().filter(|url| !url.is_empty())
        }
    }
}
