//! Dashboard configuration.
//!
//! Defaults match the local development API (`http://localhost:5001/api`)
//! and the playback speeds each page ships with. A JSON file can override
//! any subset of fields; `DASHBOARD_API_URL` overrides the endpoint last.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pages::Page;
use crate::query::QueryParams;
use crate::{DashboardError, Result};

/// Environment variable that overrides [`DashboardConfig::api_base_url`].
pub const API_URL_ENV: &str = "DASHBOARD_API_URL";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the activity API, without a trailing slash
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Query committed when the dashboard starts
    pub default_query: QueryParams,
    pub playback: PlaybackConfig,
    pub markers: MarkerConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5001/api".to_string(),
            request_timeout_secs: 30,
            default_query: QueryParams::default(),
            playback: PlaybackConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load a config file, then apply environment overrides.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: DashboardConfig =
            serde_json::from_str(&raw).map_err(|e| DashboardError::Config {
                message: format!("{}: {}", path.display(), e),
            })?;
        info!("[Config] Loaded {}", path.display());
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `DASHBOARD_API_URL` if set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            debug!("[Config] {} overrides api_base_url", API_URL_ENV);
            self.api_base_url = url;
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
    }

    /// Reject values no page can work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(DashboardError::Config {
                message: format!("api_base_url '{}' is not an http(s) URL", self.api_base_url),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(DashboardError::Config {
                message: "request_timeout_secs must be positive".to_string(),
            });
        }
        self.playback.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of an API endpoint such as `unified-data`.
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_base_url, name.trim_start_matches('/'))
    }
}

/// Playback tick interval per page, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub overview_ms: u64,
    pub geo_ms: u64,
    pub net_ms: u64,
    pub structural_ms: u64,
    pub classical_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            overview_ms: 1200,
            geo_ms: 1000,
            net_ms: 1440,
            structural_ms: 2000,
            classical_ms: 1000,
        }
    }
}

impl PlaybackConfig {
    /// Tick interval for a page.
    pub fn interval_for(&self, page: Page) -> Duration {
        let ms = match page {
            Page::Overview => self.overview_ms,
            Page::Geo => self.geo_ms,
            Page::Net => self.net_ms,
            Page::Structural => self.structural_ms,
            Page::Classical => self.classical_ms,
        };
        Duration::from_millis(ms)
    }

    fn validate(&self) -> Result<()> {
        for page in Page::ALL {
            if self.interval_for(page).is_zero() {
                return Err(DashboardError::Config {
                    message: format!("playback interval for {} must be positive", page.path()),
                });
            }
        }
        Ok(())
    }
}

/// Map marker sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Marker radius is `sqrt(ActivitySize) * radius_scale`
    pub radius_scale: f64,
    /// Map centre when there is nothing to show, as `[lat, lng]`
    pub default_center: [f64; 2],
    pub default_zoom: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius_scale: 5.4,
            // Philadelphia
            default_center: [39.9950, -75.1652],
            default_zoom: 11.0,
        }
    }
}
