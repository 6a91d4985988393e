use crate::error::{Result, RobbitError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.flickr.com/services/rest/";
pub const DEFAULT_PER_PAGE: u32 = 250;
pub const DEFAULT_MAX_RESULTS_MULTIPLIER: u32 = 8;
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1000;
pub const DEFAULT_RETRY_WAIT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RETRIES: u32 = 100;
pub const DEFAULT_WORKERS_PER_KEY: usize = 3;
pub const DEFAULT_EXTRAS: &[&str] = &["geo", "date_taken", "url_q", "url_z", "url_b", "count_faves"];

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has at least the current precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() >= self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for robbit.
///
/// Values are resolved Default < File < Environment < Cli, then frozen into
/// [`Settings`] with [`LayeredConfig::resolve`].
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub api_keys: ConfigValue<Vec<String>>,
    pub base_url: ConfigValue<String>,
    pub per_page: ConfigValue<u32>,
    pub max_results_multiplier: ConfigValue<u32>,
    pub rate_limit_ms: ConfigValue<u64>,
    pub retry_wait_ms: ConfigValue<u64>,
    pub max_retries: ConfigValue<u32>,
    pub workers_per_key: ConfigValue<usize>,
    pub extras: ConfigValue<Vec<String>>,
    pub database_url: ConfigValue<Option<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let d = ConfigSource::Default;
        Self {
            api_keys: ConfigValue::new(Vec::new(), d),
            base_url: ConfigValue::new(DEFAULT_BASE_URL.to_string(), d),
            per_page: ConfigValue::new(DEFAULT_PER_PAGE, d),
            max_results_multiplier: ConfigValue::new(DEFAULT_MAX_RESULTS_MULTIPLIER, d),
            rate_limit_ms: ConfigValue::new(DEFAULT_RATE_LIMIT_MS, d),
            retry_wait_ms: ConfigValue::new(DEFAULT_RETRY_WAIT_MS, d),
            max_retries: ConfigValue::new(DEFAULT_MAX_RETRIES, d),
            workers_per_key: ConfigValue::new(DEFAULT_WORKERS_PER_KEY, d),
            extras: ConfigValue::new(DEFAULT_EXTRAS.iter().map(|s| s.to_string()).collect(), d),
            database_url: ConfigValue::new(None, d),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RobbitError::ConfigNotFound { path: path.to_path_buf() });
        }

        let content = fs::read_to_string(path).map_err(|e| RobbitError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| RobbitError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let f = ConfigSource::File;
        if let Some(v) = file_config.api_keys {
            self.api_keys.update(v, f);
        }
        if let Some(v) = file_config.base_url {
            self.base_url.update(v, f);
        }
        if let Some(v) = file_config.per_page {
            self.per_page.update(v, f);
        }
        if let Some(v) = file_config.max_results_multiplier {
            self.max_results_multiplier.update(v, f);
        }
        if let Some(v) = file_config.rate_limit_ms {
            self.rate_limit_ms.update(v, f);
        }
        if let Some(v) = file_config.retry_wait_ms {
            self.retry_wait_ms.update(v, f);
        }
        if let Some(v) = file_config.max_retries {
            self.max_retries.update(v, f);
        }
        if let Some(v) = file_config.workers_per_key {
            self.workers_per_key.update(v, f);
        }
        if let Some(v) = file_config.extras {
            self.extras.update(v, f);
        }
        if let Some(v) = file_config.database_url {
            self.database_url.update(Some(v), f);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        let e = ConfigSource::Environment;

        // FLICKR_API_KEY is the single-key form, FLICKR_API_KEYS wins when both are set
        if let Ok(key) = env::var("FLICKR_API_KEY") {
            let keys = parse_list(&key);
            if !keys.is_empty() {
                self.api_keys.update(keys, e);
            }
        }
        if let Ok(keys) = env::var("FLICKR_API_KEYS") {
            let keys = parse_list(&keys);
            if !keys.is_empty() {
                self.api_keys.update(keys, e);
            }
        }

        if let Ok(url) = env::var("FLICKR_BASE_URL") {
            self.base_url.update(url, e);
        }

        update_parsed_env("ROBBIT_PER_PAGE", &mut self.per_page);
        update_parsed_env("ROBBIT_MAX_RESULTS_MULTIPLIER", &mut self.max_results_multiplier);
        update_parsed_env("ROBBIT_RATE_LIMIT_MS", &mut self.rate_limit_ms);
        update_parsed_env("ROBBIT_RETRY_WAIT_MS", &mut self.retry_wait_ms);
        update_parsed_env("ROBBIT_MAX_RETRIES", &mut self.max_retries);
        update_parsed_env("ROBBIT_WORKERS_PER_KEY", &mut self.workers_per_key);

        if let Ok(extras) = env::var("ROBBIT_EXTRAS") {
            self.extras.update(parse_list(&extras), e);
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database_url.update(Some(url), e);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        let c = ConfigSource::Cli;
        if let Some(keys) = overrides.api_keys {
            self.api_keys.update(keys, c);
        }
        if let Some(url) = overrides.database_url {
            self.database_url.update(Some(url), c);
        }
        if let Some(workers) = overrides.workers_per_key {
            self.workers_per_key.update(workers, c);
        }
    }

    /// Freeze into validated settings
    pub fn resolve(&self) -> Result<Settings> {
        let settings = Settings {
            api_keys: self.api_keys.value.clone(),
            base_url: self.base_url.value.clone(),
            per_page: self.per_page.value,
            max_results_multiplier: self.max_results_multiplier.value,
            rate_limit: Duration::from_millis(self.rate_limit_ms.value),
            retry_wait: Duration::from_millis(self.retry_wait_ms.value),
            max_retries: self.max_retries.value,
            workers_per_key: self.workers_per_key.value,
            extras: self.extras.value.clone(),
            database_url: self.database_url.value.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Get all configuration values as a map for inspection. API keys are masked.
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "api_keys".to_string(),
            (format!("{} key(s)", self.api_keys.value.len()), self.api_keys.source),
        );
        map.insert("base_url".to_string(), (self.base_url.value.clone(), self.base_url.source));
        map.insert("per_page".to_string(), (self.per_page.value.to_string(), self.per_page.source));
        map.insert(
            "max_results_multiplier".to_string(),
            (self.max_results_multiplier.value.to_string(), self.max_results_multiplier.source),
        );
        map.insert(
            "rate_limit_ms".to_string(),
            (self.rate_limit_ms.value.to_string(), self.rate_limit_ms.source),
        );
        map.insert(
            "retry_wait_ms".to_string(),
            (self.retry_wait_ms.value.to_string(), self.retry_wait_ms.source),
        );
        map.insert(
            "max_retries".to_string(),
            (self.max_retries.value.to_string(), self.max_retries.source),
        );
        map.insert(
            "workers_per_key".to_string(),
            (self.workers_per_key.value.to_string(), self.workers_per_key.source),
        );
        map.insert("extras".to_string(), (self.extras.value.join(","), self.extras.source));
        map.insert(
            "database_url".to_string(),
            (
                if self.database_url.value.is_some() { "set" } else { "unset" }.to_string(),
                self.database_url.source,
            ),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    api_keys: Option<Vec<String>>,
    base_url: Option<String>,
    per_page: Option<u32>,
    max_results_multiplier: Option<u32>,
    rate_limit_ms: Option<u64>,
    retry_wait_ms: Option<u64>,
    max_retries: Option<u32>,
    workers_per_key: Option<usize>,
    extras: Option<Vec<String>>,
    database_url: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub api_keys: Option<Vec<String>>,
    pub database_url: Option<String>,
    pub workers_per_key: Option<usize>,
}

/// Resolved, validated settings handed to the client and the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_keys: Vec<String>,
    pub base_url: String,
    /// Results requested per search page
    pub per_page: u32,
    /// Capacity threshold is `per_page * max_results_multiplier`
    pub max_results_multiplier: u32,
    /// Minimum spacing between two requests made with the same key
    pub rate_limit: Duration,
    /// Backoff before retrying a server-side failure
    pub retry_wait: Duration,
    /// Attempts per request before giving up
    pub max_retries: u32,
    /// Workers per API key in the scan pool
    pub workers_per_key: usize,
    /// Optional fields requested from the search
    pub extras: Vec<String>,
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            max_results_multiplier: DEFAULT_MAX_RESULTS_MULTIPLIER,
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            retry_wait: Duration::from_millis(DEFAULT_RETRY_WAIT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            workers_per_key: DEFAULT_WORKERS_PER_KEY,
            extras: DEFAULT_EXTRAS.iter().map(|s| s.to_string()).collect(),
            database_url: None,
        }
    }
}

impl Settings {
    /// Tiles reporting more results than this get split
    pub fn max_search_results(&self) -> u64 {
        self.per_page as u64 * self.max_results_multiplier as u64
    }

    /// Highest page number worth fetching during a harvest
    pub fn max_pages(&self) -> u32 {
        self.max_results_multiplier
    }

    pub fn validate(&self) -> Result<()> {
        fn positive<T: PartialEq + Default>(key: &str, value: T) -> Result<()> {
            if value == T::default() {
                return Err(RobbitError::ConfigInvalid {
                    key: key.to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
            Ok(())
        }

        positive("per_page", self.per_page)?;
        positive("max_results_multiplier", self.max_results_multiplier)?;
        positive("max_retries", self.max_retries)?;
        positive("workers_per_key", self.workers_per_key)?;
        positive("rate_limit_ms", self.rate_limit.as_millis() as u64)?;

        if self.base_url.trim().is_empty() {
            return Err(RobbitError::ConfigInvalid {
                key: "base_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        if self.api_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(RobbitError::ConfigInvalid {
                key: "api_keys".to_string(),
                reason: "keys cannot be blank".to_string(),
            });
        }

        Ok(())
    }

    /// Keys are required to talk to the remote service
    pub fn require_api_keys(&self) -> Result<&[String]> {
        if self.api_keys.is_empty() {
            return Err(RobbitError::ConfigMissing {
                key: "api_keys (FLICKR_API_KEYS)".to_string(),
            });
        }
        Ok(&self.api_keys)
    }
}

/// Split a comma separated list, dropping blanks
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn update_parsed_env<T: FromStr>(name: &str, target: &mut ConfigValue<T>) {
    if let Ok(raw) = env::var(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => target.update(value, ConfigSource::Environment),
            Err(_) => tracing::warn!("Invalid {} value '{}': expected a non-negative integer", name, raw),
        }
    }
}
