//! # Configuration
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`, or `stamm.toml` in the working directory)
//! 3. Environment variables
//!
//! Command-line flags are applied on top by the CLI.
//!
//! ## Environment Variables
//!
//! - `STAMM_DB`: database path
//! - `STAMM_LOG_FORMAT`: `text` or `json`
//! - `STAMM_GEOCODER_URL`: geocoding search endpoint
//! - `STAMM_GEOCODE_INTERVAL_MS`: minimum delay between geocoding calls
//! - `STAMM_USER_AGENT`: User-Agent sent to the geocoder

use serde::Deserialize;
use stamm_core::StammError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "stamm.toml";

pub const DEFAULT_DATABASE: &str = "stamm.redb";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
/// Slightly over the one request per second the public Nominatim allows.
pub const DEFAULT_GEOCODE_INTERVAL_MS: u64 = 1100;
pub const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = StammError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(StammError::InvalidInput(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocoderConfig {
    pub url: String,
    /// Minimum delay between two lookups. 0 disables rate limiting.
    pub min_interval_ms: u64,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GEOCODER_URL.to_string(),
            min_interval_ms: DEFAULT_GEOCODE_INTERVAL_MS,
            user_agent: format!(
                "stamm/{} (genealogy research tool)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: DEFAULT_GEOCODE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StammConfig {
    pub database: PathBuf,
    pub log_format: LogFormat,
    /// Recorded as the actor on conflict resolutions made from the CLI.
    pub resolved_by: String,
    pub geocoder: GeocoderConfig,
}

impl Default for StammConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            log_format: LogFormat::Text,
            resolved_by: "cli".to_string(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl StammConfig {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the implicit `stamm.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, StammError> {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if default_file.is_file() => Self::from_file(default_file)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, StammError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StammError::Io(format!("config {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
            .map_err(|e| StammError::InvalidInput(format!("config {}: {}", path.display(), e)))
    }

    /// Parse TOML. Missing keys keep their defaults; unknown keys are rejected.
    pub fn from_toml_str(text: &str) -> Result<Self, StammError> {
        toml::from_str(text).map_err(|e| StammError::InvalidInput(e.to_string()))
    }

    /// Apply `STAMM_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), StammError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database) = lookup("STAMM_DB") {
            self.database = PathBuf::from(database);
        }
        if let Some(format) = lookup("STAMM_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }
        if let Some(url) = lookup("STAMM_GEOCODER_URL") {
            self.geocoder.url = url;
        }
        if let Some(interval) = lookup("STAMM_GEOCODE_INTERVAL_MS") {
            self.geocoder.min_interval_ms = interval.trim().parse().map_err(|_| {
                StammError::InvalidInput(format!(
                    "STAMM_GEOCODE_INTERVAL_MS must be a whole number of milliseconds, got '{}'",
                    interval
                ))
            })?;
        }
        if let Some(agent) = lookup("STAMM_USER_AGENT") {
            self.geocoder.user_agent = agent;
        }
        Ok(())
    }
}
