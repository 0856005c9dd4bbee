//! Crawl configuration.
//!
//! A [`Config`] is read from a TOML file (by default `~/.config/pyq/config.toml` or the platform
//! equivalent) and can be adjusted with builder-style setters, which is how the CLI applies its
//! flag overrides.
//!
//! ```toml
//! base_url  = "http://papers.example.edu/"
//! root_path = "/"
//! test_dir  = "/FE/2016/"
//!
//! [years]
//! min = 2000
//! max = 2025
//!
//! [fetch]
//! timeout_secs = 30
//! max_retries  = 2
//! ```

use super::*;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for transient network failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff between retries, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Browser-like User-Agent; some listing servers reject generic HTTP clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, \
                                      like Gecko) Chrome/124.0 Safari/537.36";

/// Top-level configuration for a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Root URL of the listing server. Required.
  pub base_url:   String,
  /// Path below `base_url` where a full crawl starts
  pub root_path:  String,
  /// Path below `base_url` crawled in test mode
  pub test_dir:   String,
  /// Directory holding the knowledge store documents
  pub data_dir:   PathBuf,
  /// Directory the JSON sink writes into
  pub output_dir: PathBuf,
  /// Directory for debug log files
  pub log_dir:    PathBuf,
  /// Optional pattern table file replacing the built-in tables
  pub tables:     Option<PathBuf>,
  /// Accepted year range
  pub years:      YearRange,
  /// HTTP behaviour
  pub fetch:      FetchConfig,
}

/// Inclusive range of years accepted by the year extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
  /// Earliest accepted year
  pub min: u32,
  /// Latest accepted year
  pub max: u32,
}

/// HTTP client settings for the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
  /// User-Agent header sent with every request
  pub user_agent:     String,
  /// Per-request deadline
  pub timeout_secs:   u64,
  /// Retries for connection failures and 5xx responses
  pub max_retries:    u32,
  /// Base backoff delay, doubled on every retry
  pub retry_delay_ms: u64,
}

impl Default for YearRange {
  fn default() -> Self { Self { min: 2000, max: Utc::now().year() as u32 } }
}

impl YearRange {
  /// Whether `year` lies within the range.
  pub fn contains(&self, year: u32) -> bool { (self.min..=self.max).contains(&year) }
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      user_agent:     DEFAULT_USER_AGENT.to_string(),
      timeout_secs:   DEFAULT_TIMEOUT_SECS,
      max_retries:    DEFAULT_MAX_RETRIES,
      retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
    }
  }
}

impl FetchConfig {
  /// The per-request deadline as a [`Duration`].
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// Backoff before retry number `attempt` (starting at 1).
  pub fn backoff(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.retry_delay_ms.saturating_mul(1 << attempt.saturating_sub(1).min(6)))
  }
}

impl Default for Config {
  fn default() -> Self {
    let data_dir = Self::default_data_path();
    Self {
      base_url:   String::new(),
      root_path:  "/".to_string(),
      test_dir:   "/".to_string(),
      output_dir: data_dir.join("output"),
      log_dir:    data_dir.join("logs"),
      data_dir,
      tables:     None,
      years:      YearRange::default(),
      fetch:      FetchConfig::default(),
    }
  }
}

impl Config {
  /// Returns the default path for the configuration file.
  ///
  /// - On Unix: `~/.config/pyq/config.toml`
  /// - On macOS: `~/Library/Application Support/pyq/config.toml`
  /// - On Windows: `%APPDATA%\pyq\config.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("pyq").join("config.toml")
  }

  /// Returns the default directory for the knowledge store.
  pub fn default_data_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("pyq")
  }

  /// Reads a configuration from a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
  }

  /// Reads `path` if it exists, otherwise falls back to [`Config::default`].
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if path.exists() {
      Self::load(path)
    } else {
      debug!("No configuration at {}, using defaults", path.display());
      Ok(Self::default())
    }
  }

  /// Checks the fields a crawl cannot run without.
  pub fn validate(&self) -> Result<()> {
    if self.base_url.trim().is_empty() {
      return Err(PyqError::Config(
        "No base URL configured. Set `base_url` in the config file or pass --base-url.".into(),
      ));
    }
    Url::parse(&self.base_url)
      .map_err(|e| PyqError::Config(format!("Invalid base URL {:?}: {e}", self.base_url)))?;
    if self.years.min > self.years.max {
      return Err(PyqError::Config(format!(
        "Year range is empty: {} > {}",
        self.years.min, self.years.max
      )));
    }
    Ok(())
  }

  /// Whether `test_dir` names a subtree other than the crawl root.
  pub fn has_test_subtree(&self) -> bool {
    let test_dir = self.test_dir.trim_matches('/');
    !test_dir.is_empty() && test_dir != self.root_path.trim_matches('/')
  }

  /// Sets the listing server root URL.
  pub fn with_base_url(mut self, base_url: &str) -> Self {
    self.base_url = base_url.to_string();
    self
  }

  /// Sets the path a full crawl starts from.
  pub fn with_root_path(mut self, root_path: &str) -> Self {
    self.root_path = root_path.to_string();
    self
  }

  /// Sets the subtree crawled in test mode.
  pub fn with_test_dir(mut self, test_dir: &str) -> Self {
    self.test_dir = test_dir.to_string();
    self
  }

  /// Sets the knowledge store directory.
  pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
    self.data_dir = data_dir.to_path_buf();
    self
  }

  /// Sets the directory the JSON sink writes into.
  pub fn with_output_dir(mut self, output_dir: &Path) -> Self {
    self.output_dir = output_dir.to_path_buf();
    self
  }

  /// Sets the accepted year range.
  pub fn with_years(mut self, min: u32, max: u32) -> Self {
    self.years = YearRange { min, max };
    self
  }

  /// Replaces the HTTP settings.
  pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
    self.fetch = fetch;
    self
  }
}
