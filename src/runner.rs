//! Run driver: one isolated scraping run per category.
//!
//! For each category:
//! 1. Load the query file and extract the search matrix
//! 2. Run the orchestrator
//! 3. Report statistics
//! 4. If anything was found, persist atomically and publish to the sync sink
//!
//! An empty result never overwrites the previous file. Categories share the
//! adapter registry and sink but no run state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{Category, SearchParameters, load_search_config};
use crate::error::{Result, ScrapeError};
use crate::models::Posting;
use crate::orchestrator::run_search_matrix;
use crate::outputs::json::persist_atomic;
use crate::scrapers::AdapterRegistry;
use crate::sync::SyncSink;

/// What happened to an optional step of a category run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// Nothing to do: empty result, or sync disabled.
    Skipped,
    /// The step ran and failed; holds the reason.
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Statistics and step outcomes of one category run.
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub combinations_attempted: usize,
    pub unique_postings: usize,
    pub duplicates_discarded: usize,
    pub failed_combinations: usize,
    pub persistence: StepOutcome,
    pub sync: StepOutcome,
}

/// Outcome of a whole invocation across categories.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<CategoryReport>,
    /// Categories that never ran, with the reason.
    pub skipped: Vec<(String, ScrapeError)>,
    pub cancelled: bool,
}

impl RunSummary {
    /// True when the process should signal failure to its caller.
    pub fn has_failures(&self) -> bool {
        self.cancelled || self.reports.iter().any(|r| r.persistence.is_failed())
    }
}

/// Everything a run needs, assembled once by `main`.
pub struct Runner {
    registry: AdapterRegistry,
    sink: Option<Arc<dyn SyncSink>>,
    cancel: CancellationToken,
}

impl Runner {
    /// `sink` is `None` when remote sync is disabled.
    pub fn new(
        registry: AdapterRegistry,
        sink: Option<Arc<dyn SyncSink>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            sink,
            cancel,
        }
    }

    /// Run every category in order. Stops early only on cancellation.
    pub async fn run_all(&self, categories: &[Category]) -> RunSummary {
        let mut summary = RunSummary::default();

        for category in categories {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match self.run_category(category).await {
                Ok(report) => {
                    summary.reports.push(report);
                    if self.cancel.is_cancelled() {
                        summary.cancelled = true;
                        break;
                    }
                }
                Err(ScrapeError::Cancelled) => {
                    warn!(
                        category = %category.name,
                        "Run cancelled; nothing persisted for this category"
                    );
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!(category = %category.name, error = %e, "Skipping category");
                    summary.skipped.push((category.name.clone(), e));
                }
            }
        }

        summary
    }

    /// Scrape, persist and publish a single category.
    ///
    /// # Returns
    ///
    /// The category report, or an error when the query file is missing or
    /// invalid, or when the run was cancelled during the searches.
    #[instrument(level = "info", skip_all, fields(category = %category.name))]
    pub async fn run_category(&self, category: &Category) -> Result<CategoryReport> {
        let started_at = Utc::now();
        info!(queries = %category.queries_path.display(), "Starting category");

        let params = SearchParameters::from(load_search_config(&category.queries_path).await?);
        info!(
            keywords = params.keywords.len(),
            work_modes = params.work_modes.len(),
            limit = params.limit,
            max_searches = params.combination_count(),
            platforms = %params.platforms.iter().map(|p| p.to_uppercase()).join(", "),
            "Configuration loaded"
        );

        let results = run_search_matrix(&params, &self.registry).await?;
        info!(
            combinations = results.combinations_attempted,
            returned = results.total_returned,
            unique = results.unique_count(),
            duplicates = results.duplicates_discarded,
            failed = results.failed_combinations,
            "Orchestration finished"
        );

        let (persistence, sync) = if results.is_empty() {
            warn!(
                path = %category.destination.display(),
                "No new postings found; existing file left unchanged"
            );
            (StepOutcome::Skipped, StepOutcome::Skipped)
        } else {
            let persistence = match persist_atomic(&results.postings, &category.destination).await {
                Ok(()) => StepOutcome::Done,
                Err(e) => StepOutcome::Failed(e.to_string()),
            };
            let sync = self.publish(&results.postings, &category.sync_route).await;
            (persistence, sync)
        };

        Ok(CategoryReport {
            category: category.name.clone(),
            started_at,
            finished_at: Utc::now(),
            combinations_attempted: results.combinations_attempted,
            unique_postings: results.unique_count(),
            duplicates_discarded: results.duplicates_discarded,
            failed_combinations: results.failed_combinations,
            persistence,
            sync,
        })
    }

    /// Publish to the sink, giving up as soon as the run is cancelled.
    async fn publish(&self, postings: &[Posting], route: &str) -> StepOutcome {
        let Some(sink) = &self.sink else {
            info!(%route, "Remote sync disabled");
            return StepOutcome::Skipped;
        };
        let published = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
            res = sink.publish(postings, route) => res,
        };
        match published {
            Ok(()) => StepOutcome::Done,
            Err(ScrapeError::Cancelled) => {
                warn!(%route, "Remote sync abandoned; run cancelled");
                StepOutcome::Failed(ScrapeError::Cancelled.to_string())
            }
            Err(e) => {
                error!(%route, error = %e, "Remote sync failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::models::PostingsDocument;
    use crate::outputs::json::serialize_document;
    use crate::scrapers::testing::{FakeAdapter, posting};

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl SyncSink for RecordingSink {
        async fn publish(&self, postings: &[Posting], route: &str) -> Result<()> {
            self.published
                .lock()
                .unwrap()
                .push((route.to_string(), postings.len()));
            if self.fail {
                Err(ScrapeError::sync(route, "unreachable"))
            } else {
                Ok(())
            }
        }
    }

    /// Sink whose publish never completes, like a stalled remote.
    struct StalledSink;

    #[async_trait]
    impl SyncSink for StalledSink {
        async fn publish(&self, _postings: &[Posting], _route: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    fn write_queries(dir: &Path, name: &str) {
        let body = r#"{
            "filtros_de_busca": {"palavras_chave": ["engenheiro"], "modalidades": ["remoto"]},
            "configuracoes_gerais": {"plataformas_alvo": ["gupy"], "limite_vagas_por_pesquisa": 10}
        }"#;
        std::fs::write(dir.join(format!("queries_{name}.json")), body).unwrap();
    }

    fn registry(responses: Vec<Result<Vec<Posting>>>) -> AdapterRegistry {
        AdapterRegistry::new().register("gupy", Arc::new(FakeAdapter::new("Gupy", responses)))
    }

    #[tokio::test]
    async fn test_category_persists_and_syncs() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        let category = Category::conventional("tecnologia", dir.path(), dir.path());

        let found = vec![
            posting("https://acme.gupy.io/jobs/1", "a"),
            posting("https://acme.gupy.io/jobs/2", "b"),
            posting("https://acme.gupy.io/jobs/1", "a"),
        ];
        let sink = Arc::new(RecordingSink::default());
        let runner = Runner::new(
            registry(vec![Ok(found)]),
            Some(sink.clone()),
            CancellationToken::new(),
        );

        let report = runner.run_category(&category).await.unwrap();
        assert_eq!(report.unique_postings, 2);
        assert_eq!(report.duplicates_discarded, 1);
        assert_eq!(report.combinations_attempted, 1);
        assert_eq!(report.persistence, StepOutcome::Done);
        assert_eq!(report.sync, StepOutcome::Done);

        let doc: PostingsDocument<Vec<Posting>> =
            serde_json::from_slice(&std::fs::read(&category.destination).unwrap()).unwrap();
        assert_eq!(doc.vagas.len(), 2);
        assert_eq!(
            sink.published.lock().unwrap().as_slice(),
            &[("/vagas-tecnologia".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_empty_result_skips_persistence_and_sync() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "direito");
        let category = Category::conventional("direito", dir.path(), dir.path());
        let previous = serialize_document(&[posting("https://old.io/1", "old")]).unwrap();
        std::fs::write(&category.destination, &previous).unwrap();

        let sink = Arc::new(RecordingSink::default());
        let runner = Runner::new(
            registry(vec![Ok(vec![])]),
            Some(sink.clone()),
            CancellationToken::new(),
        );

        let report = runner.run_category(&category).await.unwrap();
        assert_eq!(report.persistence, StepOutcome::Skipped);
        assert_eq!(report.sync, StepOutcome::Skipped);
        assert_eq!(std::fs::read(&category.destination).unwrap(), previous);
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        let category = Category::conventional("tecnologia", dir.path(), dir.path());

        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let runner = Runner::new(
            registry(vec![Ok(vec![posting("https://x.io/1", "a")])]),
            Some(sink),
            CancellationToken::new(),
        );

        let report = runner.run_category(&category).await.unwrap();
        assert_eq!(report.persistence, StepOutcome::Done);
        assert!(report.sync.is_failed());
    }

    #[tokio::test]
    async fn test_persistence_failure_still_syncs() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        let category = Category::conventional("tecnologia", dir.path(), dir.path());
        std::fs::create_dir(&category.destination).unwrap();

        let sink = Arc::new(RecordingSink::default());
        let runner = Runner::new(
            registry(vec![Ok(vec![posting("https://x.io/1", "a")])]),
            Some(sink.clone()),
            CancellationToken::new(),
        );

        let summary = runner.run_all(std::slice::from_ref(&category)).await;
        assert!(summary.has_failures());
        assert!(summary.reports[0].persistence.is_failed());
        assert_eq!(summary.reports[0].sync, StepOutcome::Done);
        assert_eq!(sink.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_config_skips_only_that_category() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "direito");
        let categories = vec![
            Category::conventional("tecnologia", dir.path(), dir.path()),
            Category::conventional("direito", dir.path(), dir.path()),
        ];

        let runner = Runner::new(
            registry(vec![Ok(vec![posting("https://x.io/1", "a")])]),
            None,
            CancellationToken::new(),
        );
        let summary = runner.run_all(&categories).await;

        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "tecnologia");
        assert!(matches!(summary.skipped[0].1, ScrapeError::ConfigMissing { .. }));
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].category, "direito");
        assert_eq!(summary.reports[0].sync, StepOutcome::Skipped);
        assert!(!summary.has_failures());
    }

    #[tokio::test]
    async fn test_categories_do_not_share_dedup_state() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        write_queries(dir.path(), "direito");
        let categories = vec![
            Category::conventional("tecnologia", dir.path(), dir.path()),
            Category::conventional("direito", dir.path(), dir.path()),
        ];

        let same = || Ok(vec![posting("https://x.io/shared", "shared")]);
        let runner = Runner::new(registry(vec![same(), same()]), None, CancellationToken::new());
        let summary = runner.run_all(&categories).await;

        assert_eq!(summary.reports.len(), 2);
        assert!(summary.reports.iter().all(|r| r.unique_postings == 1));
    }

    #[tokio::test]
    async fn test_cancellation_stops_remaining_categories() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        write_queries(dir.path(), "direito");
        let categories = vec![
            Category::conventional("tecnologia", dir.path(), dir.path()),
            Category::conventional("direito", dir.path(), dir.path()),
        ];

        let runner = Runner::new(
            registry(vec![Err(ScrapeError::Cancelled)]),
            None,
            CancellationToken::new(),
        );
        let summary = runner.run_all(&categories).await;

        assert!(summary.cancelled);
        assert!(summary.reports.is_empty());
        assert!(!categories[0].destination.exists());
        assert!(summary.has_failures());
    }

    #[tokio::test]
    async fn test_cancellation_abandons_stalled_sync() {
        let dir = TempDir::new().unwrap();
        write_queries(dir.path(), "tecnologia");
        write_queries(dir.path(), "direito");
        let categories = vec![
            Category::conventional("tecnologia", dir.path(), dir.path()),
            Category::conventional("direito", dir.path(), dir.path()),
        ];

        let cancel = CancellationToken::new();
        let runner = Runner::new(
            registry(vec![Ok(vec![posting("https://acme.gupy.io/jobs/1", "a")])]),
            Some(Arc::new(StalledSink)),
            cancel.clone(),
        );
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let summary = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            runner.run_all(&categories),
        )
        .await
        .expect("sync must not outlive cancellation");
        canceller.await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.reports.len(), 1);
        let report = &summary.reports[0];
        assert_eq!(report.persistence, StepOutcome::Done);
        assert!(report.sync.is_failed());
        assert!(!categories[1].destination.exists());
        assert!(summary.has_failures());
    }
}
