//! HTTP transport with anti-blocking delays and exponential backoff.
//!
//! # Architecture
//!
//! - [`Fetch`]: a single GET returning the response body
//! - [`HttpFetch`]: the `reqwest` implementation, sending browser-like headers
//! - [`RetryFetch`]: decorator adding the human delay, retries and cancellation
//!
//! # Retry Strategy
//!
//! - 4 attempts in total (1 initial + 3 retries)
//! - Uniform "human" delay (1.5–3.5s) before every attempt
//! - Backoff before retry `n`: `2^(n-1)` seconds plus 1–2s of jitter
//! - HTTP 429 is reported as [`ScrapeError::RateLimited`]; it is retried like
//!   every other failure
//!
//! ```text
//! attempt 1 ─fail─> wait 1s+j ─> attempt 2 ─fail─> wait 2s+j ─> attempt 3
//!           ─fail─> wait 4s+j ─> attempt 4 ─fail─> TransportExhausted
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::{Rng, rng};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::{Result, ScrapeError};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

/// Per-request timeout used by [`HttpFetch`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Perform one GET and return the body.
pub trait Fetch {
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String>;
}

/// Plain `reqwest` transport, one request per call.
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    /// Build a client sending browser headers and giving up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers
}

impl Fetch for HttpFetch {
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapeError::RateLimited {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(%url, bytes = body.len(), "Received response body");
        Ok(body)
    }
}

/// Timing and retry rules for [`RetryFetch`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Unit of the exponential backoff; retry `n` waits `base * 2^(n-1)`.
    pub backoff_base: Duration,
    /// Random extra wait added to every backoff.
    pub jitter: RangeInclusive<Duration>,
    /// Random wait before every attempt.
    pub human_delay: RangeInclusive<Duration>,
    /// Whether 4xx responses other than 429 are retried.
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_secs(1),
            jitter: Duration::from_secs(1)..=Duration::from_secs(2),
            human_delay: Duration::from_millis(1500)..=Duration::from_millis(3500),
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `retry` (1-based), jitter excluded.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Replace the human delay range, swapping the bounds if given backwards.
    pub fn with_human_delay(mut self, min: Duration, max: Duration) -> Self {
        self.human_delay = if min <= max { min..=max } else { max..=min };
        self
    }
}

/// Draw a uniformly distributed duration from `range`.
fn uniform(range: &RangeInclusive<Duration>) -> Duration {
    let (lo, hi) = (range.start().as_secs_f64(), range.end().as_secs_f64());
    if hi <= lo {
        return *range.start();
    }
    Duration::from_secs_f64(rng().random_range(lo..=hi))
}

/// Wrapper adding delays, retries and cancellation to any [`Fetch`].
pub struct RetryFetch<T> {
    inner: T,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<T: Fetch> RetryFetch<T> {
    /// Wrap `inner`; every wait and request is abandoned once `cancel` fires.
    pub fn new(inner: T, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            inner,
            policy,
            cancel,
        }
    }

    /// Sleep for `delay` unless the run is cancelled first.
    async fn pause(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }
}

impl<T: Fetch> Fetch for RetryFetch<T> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let total_t0 = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            self.pause(uniform(&self.policy.human_delay)).await?;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
                res = self.inner.fetch(url, query) => res,
            };

            let e = match result {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if e.is_cancelled() {
                return Err(e);
            }
            if e.is_client_error() && !self.policy.retry_client_errors {
                warn!(attempt, error = %e, "Client error is not retried");
                return Err(e);
            }
            if attempt >= max_attempts {
                error!(
                    attempt,
                    max = max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    error = %e,
                    "fetch() exhausted retries"
                );
                return Err(ScrapeError::TransportExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }

            let delay = self.policy.backoff_delay(attempt as u32) + uniform(&self.policy.jitter);
            warn!(
                attempt,
                max = max_attempts,
                ?delay,
                error = %e,
                "Request failed; backing off"
            );
            self.pause(delay).await?;
        }
    }
}

/// The production transport stack.
pub type Transport = RetryFetch<HttpFetch>;

/// Build the production transport.
///
/// # Arguments
///
/// * `policy` - Delays and retry rules applied to every request
/// * `cancel` - Token that interrupts delays, backoff and in-flight requests
///
/// # Returns
///
/// The retrying transport, or an error if the HTTP client cannot be built.
pub fn build_transport(policy: RetryPolicy, cancel: CancellationToken) -> Result<Transport> {
    Ok(RetryFetch::new(
        HttpFetch::new(REQUEST_TIMEOUT)?,
        policy,
        cancel,
    ))
}

#[cfg(test)]
pub(crate) fn instant_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        backoff_base: Duration::ZERO,
        jitter: Duration::ZERO..=Duration::ZERO,
        human_delay: Duration::ZERO..=Duration::ZERO,
        retry_client_errors: true,
    }
}
