//! Data models for job postings and run results.
//!
//! - [`Posting`]: a normalized job record produced by a platform adapter
//! - [`WorkMode`]: the location policy of a posting
//! - [`SearchCombination`]: one (platform, keyword, work mode) search
//! - [`RunResultSet`]: unique postings plus counters for one category run
//! - [`PostingsDocument`]: the on-disk container (`{"vagas": [...]}`)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location policy of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkMode {
    Remote,
    Hybrid,
    OnSite,
}

impl WorkMode {
    /// The platform-neutral wire value (`remote`, `hybrid`, `on-site`).
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Remote => "remote",
            WorkMode::Hybrid => "hybrid",
            WorkMode::OnSite => "on-site",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized job posting.
///
/// `id` is derived from `url` by [`crate::scrapers::fingerprint`], so the same
/// posting discovered in two runs always carries the same id. Build postings
/// with [`crate::scrapers::build_posting`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Deterministic fingerprint of `url`.
    pub id: String,
    pub title: String,
    pub company: String,
    pub work_mode: WorkMode,
    /// Canonical URL, the identity key for deduplication.
    pub url: String,
    /// Publication timestamp exactly as the platform reported it.
    pub published_at: Option<String>,
    /// Name of the adapter that produced the posting (e.g. `Gupy`).
    pub source_platform: String,
}

/// One cell of the search matrix.
#[derive(Debug, Clone)]
pub struct SearchCombination<'a> {
    pub platform: &'a str,
    pub keyword: &'a str,
    pub work_mode: &'a str,
    pub limit: u32,
}

impl fmt::Display for SearchCombination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' - '{}' - '{}'",
            self.keyword, self.work_mode, self.platform
        )
    }
}

/// Aggregated output of one orchestrator run.
#[derive(Debug, Default, Clone)]
pub struct RunResultSet {
    /// Unique postings in first-discovery order.
    pub postings: Vec<Posting>,
    /// Number of (platform, keyword, work mode) searches issued.
    pub combinations_attempted: usize,
    /// Postings dropped because their URL had already been seen.
    pub duplicates_discarded: usize,
    /// Postings returned by all adapters before deduplication.
    pub total_returned: usize,
    /// Searches whose adapter returned an error (counted as empty).
    pub failed_combinations: usize,
}

impl RunResultSet {
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn unique_count(&self) -> usize {
        self.postings.len()
    }
}

/// Persisted file layout.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostingsDocument<P> {
    pub vagas: P,
}
