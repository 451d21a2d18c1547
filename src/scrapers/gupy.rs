//! Gupy employability portal adapter.
//!
//! Gupy exposes a public JSON search endpoint used by its job portal:
//!
//! ```text
//! GET https://employability-portal.gupy.io/api/v1/jobs
//!     ?jobName=<keyword>&limit=<n>&offset=0&workplaceType=<remote|hybrid|on-site>
//! ```
//!
//! The response is `{"data": [...]}`; a bare array is accepted too. Each item
//! carries `jobUrl`, `name`, `careerPageName` and `publishedDate`.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::models::Posting;
use crate::scrapers::{RawPosting, SearchAdapter, build_posting, map_work_mode};
use crate::transport::{Fetch, Transport};
use crate::utils::truncate_for_log;

/// Public job search endpoint of the Gupy portal.
pub const GUPY_JOBS_URL: &str = "https://employability-portal.gupy.io/api/v1/jobs";
const PLATFORM: &str = "Gupy";
const DEFAULT_TITLE: &str = "Título não informado";
const DEFAULT_COMPANY: &str = "Confidencial";

/// One job item as returned by the Gupy API.
///
/// Every field is read on its own: a field with an unexpected type becomes
/// `None` without affecting the others.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GupyJob {
    #[serde(deserialize_with = "lossy_string")]
    job_url: Option<String>,
    #[serde(deserialize_with = "lossy_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lossy_string")]
    career_page_name: Option<String>,
    #[serde(deserialize_with = "lossy_string")]
    published_date: Option<String>,
}

/// Strings pass through, numbers are rendered as text, anything else is `None`.
fn lossy_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// [`SearchAdapter`] for the Gupy employability portal.
#[derive(Debug)]
pub struct GupyAdapter {
    transport: Transport,
    endpoint: String,
}

impl GupyAdapter {
    /// Adapter querying the public Gupy endpoint through `transport`.
    pub fn new(transport: Transport) -> Self {
        Self::with_endpoint(transport, GUPY_JOBS_URL)
    }

    /// Adapter querying `endpoint` instead of [`GUPY_JOBS_URL`].
    pub fn with_endpoint(transport: Transport, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SearchAdapter for GupyAdapter {
    fn name(&self) -> &str {
        PLATFORM
    }

    #[instrument(level = "info", skip(self))]
    async fn search(&self, keyword: &str, work_mode: &str, limit: u32) -> Result<Vec<Posting>> {
        let mode = map_work_mode(work_mode);
        let query = [
            ("jobName", keyword.to_string()),
            ("limit", limit.to_string()),
            ("offset", "0".to_string()),
            ("workplaceType", mode.as_str().to_string()),
        ];

        let body = self.transport.fetch(&self.endpoint, &query).await?;
        let items = parse_items(&body)?;
        let received = items.len();

        let postings: Vec<_> = items
            .into_iter()
            .filter_map(|item| {
                // Non-object items carry no link and fall back to defaults.
                let job: GupyJob = serde_json::from_value(item).unwrap_or_default();
                let link = job.job_url.as_deref().unwrap_or_default();
                let posting = build_posting(
                    RawPosting {
                        title: job.name.as_deref().unwrap_or(DEFAULT_TITLE),
                        company: job.career_page_name.as_deref().unwrap_or(DEFAULT_COMPANY),
                        link,
                        published_at: job.published_date.as_deref(),
                    },
                    mode,
                    PLATFORM,
                );
                if posting.is_none() {
                    debug!(link, "Skipping Gupy item without a usable URL");
                }
                posting
            })
            .collect();

        info!(
            received,
            kept = postings.len(),
            "Parsed Gupy search results"
        );
        Ok(postings)
    }
}

/// Extract the raw item list from a response body.
fn parse_items(body: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        ScrapeError::adapter(
            PLATFORM,
            format!("invalid JSON ({e}): {}", truncate_for_log(body, 200)),
        )
    })?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(ScrapeError::adapter(
                PLATFORM,
                format!("'data' is not an array: {}", truncate_for_log(&other.to_string(), 200)),
            )),
        },
        other => Err(ScrapeError::adapter(
            PLATFORM,
            format!("unexpected response: {}", truncate_for_log(&other.to_string(), 200)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkMode;
    use crate::scrapers::fingerprint;
    use crate::transport::{HttpFetch, REQUEST_TIMEOUT, RetryFetch, instant_policy};
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> GupyAdapter {
        let transport = RetryFetch::new(
            HttpFetch::new(REQUEST_TIMEOUT).unwrap(),
            instant_policy(),
            CancellationToken::new(),
        );
        GupyAdapter::with_endpoint(transport, format!("{}/api/v1/jobs", server.uri()))
    }

    #[test]
    fn test_parse_items_shapes() {
        assert_eq!(parse_items(r#"{"data":[{"a":1}]}"#).unwrap().len(), 1);
        assert_eq!(parse_items(r#"[{"a":1},{"b":2}]"#).unwrap().len(), 2);
        assert!(parse_items(r#"{"other":true}"#).unwrap().is_empty());
        assert!(parse_items(r#"{"data":"x"}"#).is_err());
        assert!(parse_items("<html>blocked</html>").is_err());
        assert!(parse_items("42").is_err());
    }

    #[tokio::test]
    async fn test_search_maps_query_and_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs"))
            .and(query_param("jobName", "engenheiro"))
            .and(query_param("limit", "10"))
            .and(query_param("offset", "0"))
            .and(query_param("workplaceType", "hybrid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "jobUrl": "https://acme.gupy.io/jobs/1",
                        "name": "Engenheiro de Software",
                        "careerPageName": "ACME",
                        "publishedDate": "2026-10-01T10:00:00.000Z"
                    },
                    { "jobUrl": "", "name": "Sem link" },
                    { "name": "Também sem link" },
                    { "jobUrl": "https://beta.gupy.io/jobs/2" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let postings = adapter(&server)
            .search("engenheiro", "Híbrido", 10)
            .await
            .unwrap();

        assert_eq!(postings.len(), 2);
        let first = &postings[0];
        assert_eq!(first.title, "Engenheiro de Software");
        assert_eq!(first.company, "ACME");
        assert_eq!(first.work_mode, WorkMode::Hybrid);
        assert_eq!(first.source_platform, "Gupy");
        assert_eq!(first.published_at.as_deref(), Some("2026-10-01T10:00:00.000Z"));
        assert_eq!(first.id, fingerprint("https://acme.gupy.io/jobs/1"));

        let second = &postings[1];
        assert_eq!(second.title, DEFAULT_TITLE);
        assert_eq!(second.company, DEFAULT_COMPANY);
        assert!(second.published_at.is_none());
    }

    #[tokio::test]
    async fn test_mistyped_field_keeps_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "jobUrl": "https://acme.gupy.io/jobs/1",
                        "name": "Analista Jurídico",
                        "careerPageName": 42
                    },
                    {
                        "jobUrl": "https://acme.gupy.io/jobs/2",
                        "name": ["not", "a", "string"],
                        "careerPageName": "ACME",
                        "publishedDate": 1700000000
                    },
                    "not an object"
                ]
            })))
            .mount(&server)
            .await;

        let postings = adapter(&server).search("advogado", "presencial", 5).await.unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].url, "https://acme.gupy.io/jobs/1");
        assert_eq!(postings[0].title, "Analista Jurídico");
        assert_eq!(postings[0].company, "42");
        assert_eq!(postings[1].url, "https://acme.gupy.io/jobs/2");
        assert_eq!(postings[1].title, DEFAULT_TITLE);
        assert_eq!(postings[1].company, "ACME");
        assert_eq!(postings[1].published_at.as_deref(), Some("1700000000"));
    }

    #[test]
    fn test_gupy_job_reads_fields_independently() {
        let job: GupyJob = serde_json::from_value(serde_json::json!({
            "jobUrl": "https://acme.gupy.io/jobs/3",
            "name": null,
            "careerPageName": {"nested": true},
            "publishedDate": false,
            "extra": "ignored"
        }))
        .unwrap();

        assert_eq!(job.job_url.as_deref(), Some("https://acme.gupy.io/jobs/3"));
        assert!(job.name.is_none());
        assert!(job.career_page_name.is_none());
        assert!(job.published_date.is_none());
    }

    #[tokio::test]
    async fn test_search_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "jobUrl": "https://acme.gupy.io/jobs/7", "name": "Dev" }
            ])))
            .mount(&server)
            .await;

        let postings = adapter(&server).search("dev", "remoto", 5).await.unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].work_mode, WorkMode::Remote);
    }

    #[tokio::test]
    async fn test_search_reports_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(4)
            .mount(&server)
            .await;

        let err = adapter(&server).search("dev", "remoto", 5).await.unwrap_err();
        assert!(matches!(err, ScrapeError::TransportExhausted { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_search_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = adapter(&server).search("dev", "remoto", 5).await.unwrap_err();
        assert!(matches!(err, ScrapeError::AdapterFailure { .. }));
    }
}
