use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Longest accepted polling deadline (one day)
pub const MAX_DEADLINE_SECS: u64 = 86_400;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Read API connection settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Polling budget for recognition jobs
    #[serde(default)]
    pub polling: PollingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Read API connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OcrConfig {
    // @field: Service base URL, e.g. https://<resource>.cognitiveservices.azure.com/
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Subscription key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Path of the analyze operation relative to the endpoint
    #[serde(default = "default_api_path")]
    pub api_path: String,

    // @field: Header carrying the subscription key
    #[serde(default = "default_key_header")]
    pub key_header: String,

    // @field: Response header carrying the job handle
    #[serde(default = "default_job_header")]
    pub job_header: String,

    // @field: BCP-47 language hint
    #[serde(default)]
    pub language: Option<String>,

    // @field: Model version to pin
    #[serde(default)]
    pub model_version: Option<String>,

    // @field: Line ordering, "basic" or "natural"
    #[serde(default)]
    pub reading_order: Option<String>,

    // @field: Timeout seconds per HTTP request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_path: default_api_path(),
            key_header: default_key_header(),
            job_header: default_job_header(),
            language: None,
            model_version: None,
            reading_order: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OcrConfig {
    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Polling budget for a single recognition job
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Delay between status checks in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of status checks before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Overall deadline for the polling phase in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: Option<u64>,

    /// Retries of a single status check after a transient network failure
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Base backoff in milliseconds, doubled on each transient retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for any single retry wait, including server `Retry-After` hints
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            deadline_secs: default_deadline_secs(),
            transient_retries: default_transient_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Backoff before the given 0-based transient retry
    pub fn retry_backoff(&self, retry: u32) -> Duration {
        let multiplier = 2u64.saturating_pow(retry.min(16));
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(multiplier)).min(self.max_retry_delay())
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    /// Wait before a transient retry: the server hint when given, otherwise backoff, never above the cap
    pub fn retry_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|hint| hint.min(self.max_retry_delay()))
            .unwrap_or_else(|| self.retry_backoff(retry))
    }

    /// Validate the polling budget
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(anyhow!("Polling interval must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("Maximum poll attempts must be greater than zero"));
        }
        match self.deadline_secs {
            Some(0) => return Err(anyhow!("Polling deadline must be greater than zero when set")),
            Some(secs) if secs > MAX_DEADLINE_SECS => {
                return Err(anyhow!("Polling deadline must not exceed {} seconds", MAX_DEADLINE_SECS));
            }
            _ => {}
        }
        if self.max_retry_delay_ms == 0 {
            return Err(anyhow!("Maximum retry delay must be greater than zero"));
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_api_path() -> String {
    "vision/v3.2/read/analyze".to_string()
}

fn default_key_header() -> String {
    "Ocp-Apim-Subscription-Key".to_string()
}

fn default_job_header() -> String {
    "Operation-Location".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_deadline_secs() -> Option<u64> {
    Some(120)
}

fn default_transient_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500 // doubled on each retry
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

impl Config {
    /// Load a configuration file, or write the defaults there when it does not exist yet.
    ///
    /// Returns the configuration and whether it was freshly created.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok((config, false));
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok((config, true))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.ocr.endpoint.trim();
        if endpoint.is_empty() {
            return Err(anyhow!("OCR endpoint is required"));
        }
        let url = Url::parse(endpoint)
            .with_context(|| format!("OCR endpoint is not a valid URL: {}", endpoint))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("OCR endpoint must use http or https: {}", endpoint));
        }

        if self.ocr.api_key.trim().is_empty() {
            return Err(anyhow!("OCR API key is required"));
        }
        if self.ocr.key_header.trim().is_empty() || self.ocr.job_header.trim().is_empty() {
            return Err(anyhow!("OCR header names must not be empty"));
        }
        if self.ocr.timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }

        self.polling.validate()
    }
}
