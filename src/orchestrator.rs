//! Search matrix orchestration.
//!
//! Walks `platforms × keywords × work modes` in that order, one search at a
//! time, and merges every adapter's output into a single deduplicated
//! [`RunResultSet`].
//!
//! Adapter errors are logged and counted as empty searches so one platform's
//! outage never aborts the run. Cancellation is the only error that escapes.

use itertools::iproduct;
use tracing::{debug, info, instrument, warn};

use crate::config::SearchParameters;
use crate::dedup::SeenUrls;
use crate::error::{Result, ScrapeError};
use crate::models::{RunResultSet, SearchCombination};
use crate::scrapers::AdapterRegistry;

/// Run every search combination of a category and merge the results.
///
/// Platforms are visited in configured order; for each one, keywords are the
/// outer loop and work modes the inner loop. Searches run one at a time.
///
/// # Arguments
///
/// * `params` - Keywords, work modes, platforms and per-search limit
/// * `registry` - Adapters to resolve platform names against
///
/// # Returns
///
/// The deduplicated postings in first-seen order together with the run
/// counters, or [`ScrapeError::Cancelled`] if the run was cancelled.
#[instrument(level = "info", skip_all, fields(platforms = params.platforms.len()))]
pub async fn run_search_matrix(
    params: &SearchParameters,
    registry: &AdapterRegistry,
) -> Result<RunResultSet> {
    let mut seen = SeenUrls::new();
    let mut results = RunResultSet::default();

    for platform in &params.platforms {
        let Some(adapter) = registry.resolve(platform) else {
            warn!(%platform, "Platform not implemented; skipping");
            continue;
        };

        for (keyword, work_mode) in iproduct!(&params.keywords, &params.work_modes) {
            let combination = SearchCombination {
                platform,
                keyword,
                work_mode,
                limit: params.limit,
            };
            results.combinations_attempted += 1;
            info!(%combination, "Searching");

            let found = match adapter
                .search(combination.keyword, combination.work_mode, combination.limit)
                .await
            {
                Ok(found) => found,
                Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
                Err(e) => {
                    warn!(
                        %combination,
                        platform = adapter.name(),
                        error = %e,
                        "Search failed; counting it as empty"
                    );
                    results.failed_combinations += 1;
                    Vec::new()
                }
            };

            results.total_returned += found.len();
            let (fresh, duplicates) = seen.partition(found);
            results.duplicates_discarded += duplicates;

            if !fresh.is_empty() {
                info!(new = fresh.len(), duplicates, "Unique postings added");
                results.postings.extend(fresh);
            } else if duplicates > 0 {
                info!(duplicates, "Only duplicate postings found");
            } else {
                info!("No postings found");
            }
        }
    }

    debug!(seen_urls = seen.len(), "Search matrix complete");
    Ok(results)
}
