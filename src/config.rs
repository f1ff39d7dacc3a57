//! # Configuration Management
//!
//! Loads `tide-config.toml`: the location tides are reported for, the WorldTides
//! API settings, how scheduled notifications are delivered, and the recipients
//! seeded into the in-memory directory.
//!
//! A missing or malformed file is not fatal; the defaults (Risco del Paso,
//! Fuerteventura) are used instead. `WORLDTIDES_API_KEY` overrides `api.key`.

use crate::directory::RecipientEntry;
use crate::dispatcher::Delivery;
use crate::renderer::resolve_timezone;
use crate::tide_data::WORLDTIDES_API_URL;
use crate::Coordinate;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "tide-config.toml";

/// Environment variable overriding `api.key`.
pub const API_KEY_ENV: &str = "WORLDTIDES_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub location: LocationConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub recipients: Vec<RecipientEntry>,
}

/// Where tides are reported for.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Shown in report footers and bot replies
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Vertical datum heights are relative to (e.g. "MLS", "LAT")
    pub datum: String,
    /// IANA zone used for display times and for "today"
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub delivery: Delivery,
    /// Template used for scheduled notifications in template mode
    pub daily_template_id: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        MessagingConfig {
            delivery: Delivery::Template,
            daily_template_id: "daily_tides".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Risco del Paso, Fuerteventura".to_string(),
                latitude: 28.110419112734185,
                longitude: -14.260264983464896,
                datum: "MLS".to_string(),
                timezone: "Atlantic/Canary".to_string(),
            },
            api: ApiConfig {
                base_url: WORLDTIDES_API_URL.to_string(),
                key: String::new(),
                timeout_secs: 30,
            },
            messaging: MessagingConfig::default(),
            recipients: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(location = %config.location.name, path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        };

        config.with_api_key_override(std::env::var(API_KEY_ENV).ok())
    }

    /// Replace the API key when `key` is set and non-empty.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api.key = key;
        }
        self
    }

    /// Write this configuration to `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Display timezone; UTC when the configured name is unknown.
    pub fn display_timezone(&self) -> Tz {
        resolve_timezone(&self.location.timezone)
    }

    /// The current date at the configured location.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.display_timezone()).date_naive()
    }
}
