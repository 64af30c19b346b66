//! Runtime configuration from the environment (and an optional `.env` file).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::models::{ClientConfig, POSTBOX_BASE_URL};
use crate::application::DEFAULT_SETTLE_DELAY;

const APP_DIR: &str = "ing-postbox-downloader";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative whole number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub settle_delay: Duration,
    /// Postbox page to read rows from: a URL or a saved HTML file.
    pub page_location: String,
    pub settings_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings_file = dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_default()
            .join("settings.json");

        Self {
            client: ClientConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            page_location: format!("{}/postbox", POSTBOX_BASE_URL),
            settings_file,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` knows about.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("POSTBOX_BASE_URL") {
            config.client.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup("POSTBOX_DOWNLOAD_DIR") {
            config.client.download_dir = PathBuf::from(dir);
        }
        if let Some(cookie) = lookup("POSTBOX_COOKIE").filter(|c| !c.trim().is_empty()) {
            config.client.cookie = Some(cookie);
        }
        if let Some(ms) = number(&lookup, "POSTBOX_SETTLE_DELAY_MS")? {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = number(&lookup, "POSTBOX_TIMEOUT_SECS")? {
            config.client.timeout = Duration::from_secs(secs);
        }
        if let Some(page) = lookup("POSTBOX_PAGE") {
            config.page_location = page;
        }
        if let Some(file) = lookup("POSTBOX_SETTINGS_FILE") {
            config.settings_file = PathBuf::from(file);
        }

        Ok(config)
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value })
        })
        .transpose()
}
