//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from built-in defaults, TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Hosted backend connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_seconds: u64,
}

/// Object storage buckets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub event_images_bucket: String,
    pub avatars_bucket: String,
}

/// Change feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Snapshot polling period used by backends without a push transport
    pub poll_interval_ms: u64,
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; stdout only when absent
    pub file_path: Option<String>,
    pub json: bool,
}

impl Settings {
    /// Load settings from defaults, an optional configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("EVENTHUB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Load settings from an explicit file layered over the defaults
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name(path))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
                timeout_seconds: 10,
            },
            storage: StorageConfig {
                event_images_bucket: "event-images".to_string(),
                avatars_bucket: "avatars".to_string(),
            },
            feed: FeedConfig {
                poll_interval_ms: 2000,
                channel_capacity: 256,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                json: false,
            },
        }
    }
}
