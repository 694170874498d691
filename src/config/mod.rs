use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

use crate::services::tracker::TrackerConfig;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Base URL of the ingestion service (e.g., "http://localhost:8000")
    #[serde(default = "default_api_base_url")]
    #[garde(length(min = 1), custom(http_url))]
    pub api_base_url: String,

    /// Delay between job status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 100, max = 600_000))]
    pub poll_interval_ms: u64,

    /// HTTP connect and idle-read timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Give up on a job after this many consecutive status fetch failures.
    /// Unset means retry forever.
    #[serde(default)]
    #[garde(range(min = 1))]
    pub max_consecutive_fetch_failures: Option<u32>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn http_url(value: &str, _context: &()) -> garde::Result {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(garde::Error::new("must start with http:// or https://"))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_failures: self.max_consecutive_fetch_failures,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
