//! Launch configuration
//!
//! Endpoints, identifiers and timing policy for the launch sequence. The
//! defaults reproduce the production policy: a 10 second attribution
//! deadline and a 5 second organic grace period.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid timeout for {0}: must be > 0")]
    InvalidTimeout(&'static str),
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Attribution provider identifiers used for the server-side re-query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionSettings {
    pub app_id: String,
    pub dev_key: String,
    /// Platform path segment of the lookup endpoint ("ios", "android")
    pub platform: String,
    pub requery_base: String,
}

impl Default for AttributionSettings {
    fn default() -> Self {
        Self {
            app_id: "6758214455".to_string(),
            dev_key: "cqTiFvvyhL5a2SNAqqAna3".to_string(),
            platform: "ios".to_string(),
            requery_base: "https://api2.appsflyer.com/inapps/v2/app".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    pub config_endpoint: String,
    pub store_id: String,
    pub os_name: String,
    pub attribution: AttributionSettings,
    pub attribution_timeout_ms: u64,
    pub organic_grace_ms: u64,
    /// `None` leaves the config fetch unbounded
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            config_endpoint: "https://pluhykbloomora.com/config.php".to_string(),
            store_id: "id6758214455".to_string(),
            os_name: "iOS".to_string(),
            attribution: AttributionSettings::default(),
            attribution_timeout_ms: 10_000,
            organic_grace_ms: 5_000,
            fetch_timeout_ms: Some(30_000),
        }
    }
}

impl LaunchSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_endpoint(&self.config_endpoint)?;
        validate_endpoint(&self.attribution.requery_base)?;

        if self.store_id.trim().is_empty() {
            return Err(SettingsError::Missing("store_id"));
        }
        if self.os_name.trim().is_empty() {
            return Err(SettingsError::Missing("os_name"));
        }
        if self.attribution.app_id.trim().is_empty() {
            return Err(SettingsError::Missing("attribution.app_id"));
        }

        if self.attribution_timeout_ms == 0 {
            return Err(SettingsError::InvalidTimeout("attribution_timeout_ms"));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(SettingsError::InvalidTimeout("fetch_timeout_ms"));
        }

        Ok(())
    }

    pub fn attribution_timeout(&self) -> Duration {
        Duration::from_millis(self.attribution_timeout_ms)
    }

    pub fn organic_grace(&self) -> Duration {
        Duration::from_millis(self.organic_grace_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

fn validate_endpoint(url: &str) -> Result<(), SettingsError> {
    if url.trim().is_empty() {
        return Err(SettingsError::InvalidEndpoint("empty".to_string()));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(SettingsError::InvalidEndpoint(url.to_string()));
    }
    Ok(())
}
