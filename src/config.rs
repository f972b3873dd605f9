//! Runtime configuration, loaded from `recipe-finder.toml` and the environment.

use crate::fetch::{FetchOptions, RetryPolicy};
use crate::spoonacular::DEFAULT_BASE_URL;
use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const CONFIG_FILE: &str = "recipe-finder.toml";

#[derive(Clone, Deserialize)]
pub struct Config {
    pub spoonacular_api_key: String,
    #[serde(default = "default_base_url")]
    pub spoonacular_base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_cache_ttl", deserialize_with = "deserialize_duration")]
    pub cache_ttl: Duration,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    #[serde(default = "default_request_timeout", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay", deserialize_with = "deserialize_duration")]
    pub retry_base_delay: Duration,
    #[serde(default = "default_retry_max_delay", deserialize_with = "deserialize_duration")]
    pub retry_max_delay: Duration,
    #[serde(default)]
    pub requests_per_second: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("spoonacular_api_key", &"<redacted>")
            .field("spoonacular_base_url", &self.spoonacular_base_url)
            .field("log_level", &self.log_level)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_cache_max_entries() -> usize {
    128
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> Duration {
    Duration::from_millis(250)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(5)
}

impl Config {
    /// The file provider is merged first so environment variables win.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract().context("Failed to load config")?;
        if config.spoonacular_api_key.trim().is_empty() {
            anyhow::bail!("SPOONACULAR_API_KEY must not be empty");
        }
        if config.request_timeout.is_zero() {
            anyhow::bail!("REQUEST_TIMEOUT must be greater than zero");
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay.max(self.retry_base_delay),
            ..RetryPolicy::default()
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.request_timeout,
            retry: self.retry_policy(),
            requests_per_second: self.requests_per_second,
        }
    }
}

/// Accepts bare numbers as seconds, or human durations like `250ms`, `10s`, `5m`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Fractional(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Fractional(secs) => {
            Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
        }
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_duration(text: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(text.trim())
        .map_err(|e| format!("invalid duration '{text}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{text}': {e}"))
}
