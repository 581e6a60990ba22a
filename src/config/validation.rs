//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_backend_config(&settings.backend)?;
    validate_storage_config(&settings.storage)?;
    validate_feed_config(&settings.feed)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate backend configuration
fn validate_backend_config(config: &super::BackendConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Backend URL is required".to_string()
        ));
    }

    let url = url::Url::parse(&config.url)
        .map_err(|e| EventHubError::Config(format!("Invalid backend URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EventHubError::Config(
            format!("Backend URL must use http or https, got {}", url.scheme())
        ));
    }

    if config.anon_key.is_empty() {
        return Err(EventHubError::Config(
            "Backend anon key is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Backend timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate storage configuration
fn validate_storage_config(config: &super::StorageConfig) -> Result<()> {
    if config.event_images_bucket.is_empty() || config.avatars_bucket.is_empty() {
        return Err(EventHubError::Config(
            "Storage bucket names cannot be empty".to_string()
        ));
    }

    Ok(())
}

/// Validate change feed configuration
pub fn validate_feed_config(config: &super::FeedConfig) -> Result<()> {
    if config.poll_interval_ms == 0 {
        return Err(EventHubError::Config(
            "Feed poll interval must be greater than 0".to_string()
        ));
    }

    if config.channel_capacity == 0 {
        return Err(EventHubError::Config(
            "Feed channel capacity must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
