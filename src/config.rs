use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::Protocol;
use crate::error::{LagError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub protocols: Vec<Protocol>,
    pub window: WindowConfig,
    pub lags: LagConfig,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Number of calendar days in the analysis window
    pub days: u32,
    /// Days between today (UTC) and the last day of the window (1 = yesterday)
    #[serde(default = "default_end_offset_days")]
    pub end_offset_days: u32,
}

fn default_end_offset_days() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagConfig {
    pub min: i32,
    pub max: i32,
}

impl LagConfig {
    /// All lags from `min` to `max` inclusive, ascending
    pub fn range(&self) -> Vec<i32> {
        (self.min..=self.max).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds
    pub backoff_base_ms: u64,
    /// Maximum backoff delay, in milliseconds
    pub backoff_max_ms: u64,
    /// HTTP status codes that trigger a retry
    pub retry_statuses: Vec<u16>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("tvl-price-lag/{}", env!("CARGO_PKG_VERSION"))
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// DefiLlama API base (TVL history)
    pub tvl_base_url: String,
    /// CoinGecko API base (price history)
    pub price_base_url: String,
    /// Quote currency for prices
    pub vs_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub data_file: String,
    pub correlations_file: String,
}

impl OutputConfig {
    pub fn data_path(&self) -> PathBuf {
        self.dir.join(&self.data_file)
    }

    pub fn correlations_path(&self) -> PathBuf {
        self.dir.join(&self.correlations_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for a daily rotated log file (disabled when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            protocols: vec![
                Protocol::new("uniswap", "UNI", "uniswap"),
                Protocol::new("aave", "AAVE", "aave"),
            ],
            window: WindowConfig {
                days: 60,
                end_offset_days: default_end_offset_days(),
            },
            lags: LagConfig { min: -5, max: 5 },
            http: HttpConfig {
                timeout_secs: 30,
                max_retries: 5,
                backoff_base_ms: 1_000,
                backoff_max_ms: 120_000,
                retry_statuses: vec![500, 502, 503, 504],
                user_agent: default_user_agent(),
            },
            sources: SourcesConfig {
                tvl_base_url: "https://api.llama.fi".to_string(),
                price_base_url: "https://api.coingecko.com/api/v3".to_string(),
                vs_currency: "usd".to_string(),
            },
            output: OutputConfig {
                dir: PathBuf::from("."),
                data_file: "data.csv".to_string(),
                correlations_file: "correlations.csv".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with the built-in protocol set and constants
            .add_source(Config::try_from(&AppConfig::default())?)
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TVL_LAG_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TVL_LAG_WINDOW__DAYS, etc.)
            .add_source(
                Environment::with_prefix("TVL_LAG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.protocols.is_empty() {
            return Err(LagError::Validation(
                "at least one protocol must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for protocol in &self.protocols {
            protocol.validate()?;
            if !seen.insert(protocol.slug.as_str()) {
                return Err(LagError::Validation(format!(
                    "duplicate protocol slug: {}",
                    protocol.slug
                )));
            }
        }

        if self.window.days == 0 {
            return Err(LagError::Validation("window.days must be > 0".to_string()));
        }
        if self.lags.min > self.lags.max {
            return Err(LagError::Validation(format!(
                "lags.min ({}) must not exceed lags.max ({})",
                self.lags.min, self.lags.max
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(LagError::Validation(
                "http.timeout_secs must be > 0".to_string(),
            ));
        }

        for (name, raw) in [
            ("sources.tvl_base_url", &self.sources.tvl_base_url),
            ("sources.price_base_url", &self.sources.price_base_url),
        ] {
            url::Url::parse(raw)
                .map_err(|e| LagError::Validation(format!("invalid {}: {} ({})", name, raw, e)))?;
        }

        Ok(())
    }
}
