//! Remote publishing of a category's postings.
//!
//! A [`SyncSink`] receives the complete, deduplicated posting list of a
//! category and replaces whatever is stored at the category's route. Sync is
//! best-effort: the run driver logs failures and moves on.
//!
//! [`FirebaseSink`] targets the Firebase Realtime Database REST API:
//!
//! ```text
//! PUT {FIREBASE_DB_URL}/vagas-tecnologia.json?auth={FIREBASE_AUTH_TOKEN}
//! [ {posting}, {posting}, ... ]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::{Result, ScrapeError};
use crate::models::Posting;

#[async_trait]
pub trait SyncSink: Send + Sync {
    /// Replace the data stored at `route` with `postings`.
    async fn publish(&self, postings: &[Posting], route: &str) -> Result<()>;
}

/// Firebase Realtime Database sink using the REST API.
#[derive(Debug, Clone)]
pub struct FirebaseSink {
    client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseSink {
    /// `auth_token`, when set, is sent as the `auth` query parameter.
    pub fn new(database_url: &str, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// REST endpoint for a route such as `/vagas-direito`.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/{}.json", self.database_url, route.trim_matches('/'))
    }
}

#[async_trait]
impl SyncSink for FirebaseSink {
    #[instrument(level = "info", skip_all, fields(%route, count = postings.len()))]
    async fn publish(&self, postings: &[Posting], route: &str) -> Result<()> {
        let mut request = self.client.put(self.endpoint(route)).json(postings);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScrapeError::sync(route, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::sync(
                route,
                format!("HTTP {status}: {}", crate::utils::truncate_for_log(&body, 200)),
            ));
        }

        info!("Postings published to remote database");
        Ok(())
    }
}
