use serde::Deserialize;

/// Main configuration structure for Price-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "retailer")]
    pub retailers: Vec<RetailerConfig>,
}

impl Config {
    /// Looks up a retailer entry by name
    pub fn retailer(&self, name: &str) -> Option<&RetailerConfig> {
        self.retailers.iter().find(|r| r.name == name)
    }
}

/// Batch runner and fetcher behavior
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Number of identifiers fetched concurrently and persisted together
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per identifier before it is recorded as a transient failure
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout for a single attempt, including reading the body (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Timeout for establishing a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Re-attempt the transient failures of each batch once before persisting it
    #[serde(rename = "batch-retry-pass", default)]
    pub batch_retry_pass: bool,

    /// Delay before the per-batch retry pass (milliseconds)
    #[serde(rename = "batch-retry-delay-ms", default = "default_batch_retry_delay_ms")]
    pub batch_retry_delay_ms: u64,
}

fn default_batch_size() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_batch_retry_delay_ms() -> u64 {
    500
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            batch_retry_pass: false,
            batch_retry_delay_ms: default_batch_retry_delay_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the tracker
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the tracker
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the tracker
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Directory receiving one CSV file per retailer
    #[serde(rename = "csv-dir", default)]
    pub csv_dir: Option<String>,
}

/// One retailer to track
#[derive(Debug, Clone, Deserialize)]
pub struct RetailerConfig {
    /// Unique name, used for log lines, CSV file names and database rows
    pub name: String,

    /// Built-in selector profile (e.g. "home-depot")
    #[serde(default)]
    pub profile: Option<String>,

    /// Inline selectors; take precedence over the profile's
    #[serde(default)]
    pub selectors: Option<SelectorConfig>,

    /// Path to the identifier CSV
    pub input: String,

    /// Column holding the identifier
    #[serde(rename = "id-column")]
    pub id_column: String,

    /// Column holding an explicit product URL
    #[serde(rename = "url-column", default)]
    pub url_column: Option<String>,

    /// Columns carried through to the sinks unchanged
    #[serde(rename = "metadata-columns", default)]
    pub metadata_columns: Vec<String>,

    /// Fallback URL with `{id}` and `{<metadata column>}` placeholders
    #[serde(rename = "url-pattern", default)]
    pub url_pattern: Option<String>,

    #[serde(rename = "max-attempts", default)]
    pub max_attempts: Option<u32>,

    #[serde(rename = "retry-delay-ms", default)]
    pub retry_delay_ms: Option<u64>,

    /// HTTP statuses that end the retry loop immediately
    #[serde(rename = "terminal-statuses", default)]
    pub terminal_statuses: Option<Vec<u16>>,
}

/// CSS selectors describing one retailer's product page
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub title: String,
    pub price: PriceSelector,
    /// Any match marks the page as "item does not exist"
    #[serde(default)]
    pub not_found: Vec<MarkerConfig>,
    pub stock: StockConfig,
}

/// Where the price text lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceSelector {
    /// A single element holding the whole price
    Single(String),

    /// Dollars and cents rendered in separate elements; cents come from the last match
    Split {
        dollars: String,
        cents: String,
        #[serde(default = "default_price_separator")]
        separator: String,
    },
}

fn default_price_separator() -> String {
    ".".to_string()
}

/// An element that must be present, optionally containing a text fragment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerConfig {
    pub selector: String,

    /// Case-insensitive fragment the element's text must contain
    #[serde(default)]
    pub contains: Option<String>,
}

/// How stock availability is derived from the page
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockConfig {
    /// In stock when any marker is present (e.g. an "add to cart" button)
    InStockMarkers(Vec<MarkerConfig>),

    /// Out of stock when any marker is present (e.g. an "out of stock" banner)
    OutOfStockMarkers(Vec<MarkerConfig>),
}
