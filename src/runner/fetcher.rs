//! HTTP fetcher with a bounded retry policy
//!
//! This module handles all HTTP requests for a run, including:
//! - Building the HTTP client with the tracker's user agent string
//! - Per-attempt timeouts
//! - A fixed-delay retry loop with no backoff growth
//! - Asking the site adapter whether a failure is worth retrying

use crate::adapter::SiteAdapter;
use crate::config::{RetailerConfig, RunnerConfig, UserAgentConfig};
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The server answered with a non-success status
    Status(u16),

    /// The attempt did not finish within the per-attempt timeout
    Timeout,

    /// Connection, TLS or protocol error
    Transport(String),

    /// The response body could not be read
    Body(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Body(e) => write!(f, "failed to read body: {}", e),
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// A fetch that gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub target: String,

    /// Attempts made before giving up
    pub attempts: u32,

    pub last_error: FetchFailure,

    /// True if the adapter declared the failure terminal before the budget ran out
    pub terminal: bool,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.target, self.attempts, self.last_error
        )
    }
}

impl std::error::Error for FetchError {}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: String,

    /// URL after redirects
    pub final_url: String,

    pub status: u16,

    /// Attempt on which the fetch succeeded, starting at 1
    pub attempts: u32,
}

/// Retry budget for one retailer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per identifier, including the first
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub delay: Duration,

    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Builds the policy for a retailer, applying its overrides to the runner defaults
    pub fn for_retailer(runner: &RunnerConfig, retailer: &RetailerConfig) -> Self {
        Self {
            max_attempts: retailer.max_attempts.unwrap_or(runner.max_attempts).max(1),
            delay: Duration::from_millis(retailer.retry_delay_ms.unwrap_or(runner.retry_delay_ms)),
            attempt_timeout: Duration::from_millis(runner.request_timeout_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let runner = RunnerConfig::default();
        Self {
            max_attempts: runner.max_attempts,
            delay: Duration::from_millis(runner.retry_delay_ms),
            attempt_timeout: Duration::from_millis(runner.request_timeout_ms),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is formatted as `Name/Version (+ContactURL)`.
///
/// # Example
///
/// ```no_run
/// use price_sweep::config::{RunnerConfig, UserAgentConfig};
/// use price_sweep::runner::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "PriceSweep".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: Some("https://example.com/about".to_string()),
/// };
///
/// let client = build_http_client(&user_agent, &RunnerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    runner: &RunnerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_millis(runner.request_timeout_ms))
        .connect_timeout(Duration::from_millis(runner.connect_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches product pages with a fixed-delay retry loop
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL, retrying failures until the budget runs out
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx with readable body | Return the page |
    /// | Adapter says "don't retry" | Give up immediately |
    /// | Any other status, timeout or transport error | Wait the fixed delay, retry |
    /// | `max_attempts` failures | Give up |
    ///
    /// Each attempt runs under its own timeout, so a hung connection can cost at most one
    /// attempt. Redirects are followed by the client.
    pub async fn fetch(&self, url: &Url, adapter: &dyn SiteAdapter) -> Result<Fetched, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.policy.attempt_timeout, self.attempt(url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchFailure::Timeout),
            };

            let failure = match result {
                Ok((status, final_url, body)) => {
                    tracing::debug!(
                        "[{}] Fetched {} on attempt {}/{}",
                        adapter.name(),
                        url,
                        attempt,
                        max_attempts
                    );
                    return Ok(Fetched {
                        body,
                        final_url,
                        status,
                        attempts: attempt,
                    });
                }
                Err(failure) => failure,
            };

            tracing::warn!(
                "[{}] Attempt {}/{} for {} failed: {}",
                adapter.name(),
                attempt,
                max_attempts,
                url,
                failure
            );

            if !adapter.should_retry(&failure) {
                tracing::error!(
                    "[{}] Giving up on {} after {} attempt(s): {} is terminal",
                    adapter.name(),
                    url,
                    attempt,
                    failure
                );
                return Err(FetchError {
                    target: url.to_string(),
                    attempts: attempt,
                    last_error: failure,
                    terminal: true,
                });
            }

            if attempt >= max_attempts {
                tracing::error!(
                    "[{}] Retries exhausted for {} after {} attempts, last error: {}",
                    adapter.name(),
                    url,
                    attempt,
                    failure
                );
                return Err(FetchError {
                    target: url.to_string(),
                    attempts: attempt,
                    last_error: failure,
                    terminal: false,
                });
            }

            tokio::time::sleep(self.policy.delay).await;
        }
    }

    async fn attempt(&self, url: &Url) -> Result<(u16, String, String), FetchFailure> {
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Body(e.to_string()))?;

        Ok((status.as_u16(), final_url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Classification, SiteAdapter};
    use crate::source::ItemRecord;
    use scraper::Html;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct TestAdapter {
        terminal: Vec<u16>,
    }

    impl SiteAdapter for TestAdapter {
        fn name(&self) -> &str {
            "test"
        }

        fn build_target(&self, _item: &ItemRecord) -> Option<Url> {
            None
        }

        fn classify(&self, _document: &Html) -> Classification {
            Classification::NotFound
        }

        fn should_retry(&self, failure: &FetchFailure) -> bool {
            !matches!(failure, FetchFailure::Status(code) if self.terminal.contains(code))
        }
    }

    fn create_test_user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestSweep".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: Some("https://example.com/about".to_string()),
        }
    }

    fn fetcher(max_attempts: u32) -> Fetcher {
        let client = build_http_client(&create_test_user_agent(), &RunnerConfig::default()).unwrap();
        Fetcher::new(
            client,
            RetryPolicy {
                max_attempts,
                delay: Duration::from_millis(5),
                attempt_timeout: Duration::from_millis(500),
            },
        )
    }

    fn adapter() -> TestAdapter {
        TestAdapter { terminal: vec![] }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_user_agent(), &RunnerConfig::default()).is_ok());
    }

    #[test]
    fn test_policy_overrides() {
        let runner = RunnerConfig::default();
        let mut retailer: RetailerConfig = toml::from_str(
            r#"
            name = "acme"
            profile = "home-depot"
            input = "skus.csv"
            id-column = "SKU"
            "#,
        )
        .unwrap();

        let policy = RetryPolicy::for_retailer(&runner, &retailer);
        assert_eq!(policy.max_attempts, runner.max_attempts);

        retailer.max_attempts = Some(3);
        retailer.retry_delay_ms = Some(5000);
        let policy = RetryPolicy::for_retailer(&runner, &retailer);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/A"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>A</h1>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/A", server.uri())).unwrap();
        let fetched = fetcher(10).fetch(&url, &adapter()).await.unwrap();

        assert_eq!(fetched.attempts, 1);
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body, "<h1>A</h1>");
    }

    #[tokio::test]
    async fn test_succeeds_on_fourth_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/C"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/C"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/C", server.uri())).unwrap();
        let fetched = fetcher(10).fetch(&url, &adapter()).await.unwrap();

        assert_eq!(fetched.attempts, 4);
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_exhausts_budget_with_exact_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/D"))
            .respond_with(ResponseTemplate::new(502))
            .expect(10)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/D", server.uri())).unwrap();
        let error = fetcher(10).fetch(&url, &adapter()).await.unwrap_err();

        assert_eq!(error.attempts, 10);
        assert_eq!(error.last_error, FetchFailure::Status(502));
        assert!(!error.terminal);
    }

    #[tokio::test]
    async fn test_terminal_status_stops_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/E"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/E", server.uri())).unwrap();
        let adapter = TestAdapter { terminal: vec![500] };
        let error = fetcher(10).fetch(&url, &adapter).await.unwrap_err();

        assert_eq!(error.attempts, 1);
        assert!(error.terminal);
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/p/slow", server.uri())).unwrap();
        let error = fetcher(2).fetch(&url, &adapter()).await.unwrap_err();

        assert_eq!(error.attempts, 2);
        assert_eq!(error.last_error, FetchFailure::Timeout);
    }
}
