// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session-wide settings.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::compositor::CompositorSettings;
use crate::content::service_date;
use crate::error::ConfigError;
use crate::time::Duration;

/// Configuration for one AR session.
///
/// Every field has a default, so a page may override any subset with JSON:
///
/// ```
/// # use hilal_core::SessionConfig;
/// let config = SessionConfig::from_json(r#"{ "mesh_retry_delay_ms": 500 }"#).unwrap();
/// assert_eq!(config.content_timeout_ms, 8000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// URL of the pre-generated hadith collection.
    pub hadith_url: String,
    /// Gregorian-to-Hijri conversion endpoint; `?date=DD-MM-YYYY` is appended.
    pub calendar_url: String,
    /// URL of the marker configuration rows.
    pub markers_url: String,
    /// Delay before retrying a compositor whose mesh was missing.
    pub mesh_retry_delay_ms: u64,
    /// How long each content fetch may take before its fallback is used.
    pub content_timeout_ms: u64,
}

impl SessionConfig {
    /// Defaults for a page served next to its data files.
    #[must_use]
    pub fn web() -> Self {
        Self {
            hadith_url: "daily-hadith.json".into(),
            calendar_url: "https://api.aladhan.com/v1/gToH".into(),
            markers_url: "markers.json".into(),
            mesh_retry_delay_ms: 250,
            content_timeout_ms: 8000,
        }
    }

    /// Parses a (possibly partial) JSON override.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        if config.content_timeout_ms == 0 {
            return Err(ConfigError::Malformed(
                "content_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(config)
    }

    /// The calendar request URL for `date`.
    #[must_use]
    pub fn calendar_request(&self, date: NaiveDate) -> String {
        format!("{}?date={}", self.calendar_url, service_date(date))
    }

    /// Deadline for each content fetch.
    #[must_use]
    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    /// Compositor settings derived from this configuration.
    #[must_use]
    pub fn compositor(&self) -> CompositorSettings {
        CompositorSettings {
            mesh_retry_delay: Duration::from_millis(self.mesh_retry_delay_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::web()
    }
}
