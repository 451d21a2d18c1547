//! Error taxonomy for the scraping pipeline.
//!
//! Every failure below the run driver ends up as one of these variants. The
//! driver decides which ones are fatal for a category (`ConfigMissing`,
//! `ConfigInvalid`, `Cancelled`) and which ones are only reported.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The category's query file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigMissing { path: PathBuf },

    /// The query file exists but could not be parsed.
    #[error("invalid configuration in {}: {message}", path.display())]
    ConfigInvalid { path: PathBuf, message: String },

    /// The platform answered HTTP 429.
    #[error("rate limit exceeded (HTTP 429) for {url}")]
    RateLimited { url: String },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Connection, timeout or body decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every attempt allowed by the retry policy failed.
    #[error("gave up after {attempts} attempts: {source}")]
    TransportExhausted {
        attempts: usize,
        #[source]
        source: Box<ScrapeError>,
    },

    /// The run was cancelled while waiting or while a request was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// Adapter-internal fault such as an unexpected response shape.
    #[error("{platform} adapter failed: {message}")]
    AdapterFailure { platform: String, message: String },

    /// Writing or replacing the destination file failed.
    #[error("failed to persist {}: {message}", path.display())]
    PersistenceFailure { path: PathBuf, message: String },

    /// The remote sink rejected the publish or was unreachable.
    #[error("sync to '{route}' failed: {message}")]
    SyncFailure { route: String, message: String },
}

impl ScrapeError {
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn adapter(platform: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::AdapterFailure {
            platform: platform.into(),
            message: message.to_string(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn sync(route: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SyncFailure {
            route: route.into(),
            message: message.to_string(),
        }
    }

    /// True for HTTP 4xx responses other than 429.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status.is_client_error())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
