//! Platform adapters that turn a job-board API into [`Posting`]s.
//!
//! Each adapter implements [`SearchAdapter`] and is registered under a
//! platform name in an [`AdapterRegistry`]. The orchestrator looks adapters up
//! by name (case-insensitive), so adding a platform means registering a new
//! adapter, nothing else.
//!
//! # Supported Platforms
//!
//! | Platform | Module | Method | Notes |
//! |----------|--------|--------|-------|
//! | Gupy | [`gupy`] | JSON API | Public employability portal search |
//!
//! # Common Helpers
//!
//! - [`canonical_url`]: the identity key of a posting
//! - [`fingerprint`]: deterministic id derived from the canonical URL
//! - [`map_work_mode`]: free-text work mode to [`WorkMode`]
//! - [`build_posting`]: assembles a [`Posting`] keeping `id` tied to `url`

pub mod gupy;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::models::{Posting, WorkMode};

/// A job platform that can be searched by keyword and work mode.
///
/// Implementations return `Err` for network exhaustion or malformed
/// responses; the orchestrator logs the cause and counts the search as empty.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Human-readable platform name, stored in [`Posting::source_platform`].
    fn name(&self) -> &str;

    /// Search the platform, returning at most `limit` postings.
    async fn search(&self, keyword: &str, work_mode: &str, limit: u32) -> Result<Vec<Posting>>;
}

/// Platform name to adapter lookup.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SearchAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry; chain [`AdapterRegistry::register`] to fill it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `platform`, replacing any previous entry.
    pub fn register(mut self, platform: &str, adapter: Arc<dyn SearchAdapter>) -> Self {
        self.adapters.insert(platform.to_lowercase(), adapter);
        self
    }

    /// Adapter registered under `platform`, ignoring case.
    pub fn resolve(&self, platform: &str) -> Option<Arc<dyn SearchAdapter>> {
        self.adapters.get(&platform.to_lowercase()).cloned()
    }

    /// Registered platform keys, sorted.
    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Deterministic 16-character id for a canonical URL.
pub fn fingerprint(url: &str) -> String {
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    digest[..16].to_string()
}

/// Canonical form of a raw posting link: the link with surrounding
/// whitespace removed.
///
/// The link is parsed only to validate it. The text itself is kept as the
/// platform sent it (no host lower-casing, percent-encoding or trailing `/`),
/// so fingerprints stay equal to the ids of previously stored postings.
///
/// Returns `None` for empty links and anything that is not an absolute
/// http(s) URL; such records cannot be identified and are dropped.
pub fn canonical_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = Url::parse(trimmed).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(trimmed.to_string()),
        _ => None,
    }
}

/// Translate a configured work mode ("remoto", "home office", "híbrido",
/// "presencial", ...) into a [`WorkMode`].
///
/// Unrecognized text maps to [`WorkMode::Remote`].
pub fn map_work_mode(text: &str) -> WorkMode {
    let term = text.to_lowercase();
    if term.contains("home") || term.contains("remot") {
        WorkMode::Remote
    } else if term.contains("hibrido") || term.contains("híbrido") || term.contains("hybrid") {
        WorkMode::Hybrid
    } else if term.contains("presencial") || term.contains("on-site") || term.contains("onsite")
    {
        WorkMode::OnSite
    } else {
        WorkMode::Remote
    }
}

/// Fields an adapter extracts from one raw record.
#[derive(Debug, Clone, Copy)]
pub struct RawPosting<'a> {
    pub title: &'a str,
    pub company: &'a str,
    pub link: &'a str,
    pub published_at: Option<&'a str>,
}

/// Build a [`Posting`], or `None` when the link has no canonical form.
pub fn build_posting(raw: RawPosting<'_>, work_mode: WorkMode, platform: &str) -> Option<Posting> {
    let url = canonical_url(raw.link)?;
    Some(Posting {
        id: fingerprint(&url),
        title: raw.title.to_string(),
        company: raw.company.to_string(),
        work_mode,
        url,
        published_at: raw.published_at.map(str::to_string),
        source_platform: platform.to_string(),
    })
}
