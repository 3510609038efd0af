//! Timetables API HTTP client.
//!
//! Fetches raw XML for station search, planned timetables and changes.
//! Transient failures (429 and 5xx gateway errors, transport errors) are
//! retried with exponential backoff up to a bounded number of attempts.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use super::error::{FetchError, snippet};
use super::stations::parse_stations;
use super::types::StationEntry;

/// Default base URL for the DB API Marketplace.
const DEFAULT_BASE_URL: &str = "https://apis.deutschebahn.com/db-api-marketplace/apis";

const DEFAULT_USER_AGENT: &str = concat!("train-delays/", env!("CARGO_PKG_VERSION"));

/// Status codes worth retrying.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry behaviour for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `backoff * 2^(n-1)` before retrying.
    pub backoff: Duration,
    pub statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    fn should_retry(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status.as_u16())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
            statuses: RETRY_STATUSES.to_vec(),
        }
    }
}

/// Configuration for the Timetables client.
#[derive(Debug, Clone)]
pub struct TimetablesConfig {
    /// Value of the `DB-Client-Id` header
    pub client_id: String,
    /// Value of the `DB-Api-Key` header
    pub api_key: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
    /// Pause between consecutive requests of one fetch run
    pub pause: Duration,
}

impl TimetablesConfig {
    /// Create a new config with the given credentials.
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            pause: Duration::from_millis(200),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// A successful response body with its declared content type.
#[derive(Debug, Clone)]
struct Fetched {
    content_type: String,
    body: String,
}

/// Timetables API client.
#[derive(Debug, Clone)]
pub struct TimetablesClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    pause: Duration,
}

impl TimetablesClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TimetablesConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("db-client-id"),
            header_value(&config.client_id, "client id")?,
        );
        headers.insert(
            HeaderName::from_static("db-api-key"),
            header_value(&config.api_key, "API key")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));
        headers.insert(USER_AGENT, header_value(&config.user_agent, "user agent")?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
            pause: config.pause,
        })
    }

    /// Pause to keep between consecutive requests.
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Search stations by name pattern.
    ///
    /// Returns at most `limit` hits in API order.
    pub async fn find_station(
        &self,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<StationEntry>, FetchError> {
        let url = self.endpoint(&["timetables", "v1", "station", pattern])?;
        let fetched = self.get(url).await?;

        if !fetched.content_type.to_ascii_lowercase().contains("xml") {
            return Err(FetchError::UnexpectedContent {
                content_type: fetched.content_type,
                snippet: snippet(&fetched.body),
            });
        }

        let mut stations = parse_stations(&fetched.body)?;
        stations.truncate(limit);
        Ok(stations)
    }

    /// Get the planned timetable for a station and hour.
    ///
    /// # Arguments
    ///
    /// * `eva` - Station EVA number
    /// * `yymmdd` - Date as `YYMMDD`
    /// * `hour` - Hour of day, 0-23
    pub async fn get_plan(&self, eva: &str, yymmdd: &str, hour: u32) -> Result<String, FetchError> {
        let hour = format!("{hour:02}");
        let url = self.endpoint(&["timetables", "v1", "plan", eva, yymmdd, &hour])?;
        Ok(self.get(url).await?.body)
    }

    /// Get all known changes for a station.
    pub async fn get_changes(&self, eva: &str) -> Result<String, FetchError> {
        let url = self.endpoint(&["timetables", "v1", "fchg", eva])?;
        Ok(self.get(url).await?.body)
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest(format!("base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET with retries on transient failures.
    async fn get(&self, url: reqwest::Url) -> Result<Fetched, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let last = attempt >= max_attempts;

            let response = match self.http.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) if !last => {
                    warn!(url = %url, attempt, error = %e, "request failed, retrying");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            debug!(url = %url, attempt, status = status.as_u16(), "timetables response");

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(FetchError::Unauthorized);
            }

            if self.retry.should_retry(status) {
                if !last {
                    warn!(url = %url, attempt, status = status.as_u16(), "transient status, retrying");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    continue;
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(FetchError::RateLimited { attempts: attempt });
                }
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Api {
                    status: status.as_u16(),
                    message: snippet(&body),
                });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.text().await?;

            return Ok(Fetched { content_type, body });
        }
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value).map_err(|_| FetchError::InvalidRequest(format!("invalid {what}")))
}
