use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Device base address, e.g. `http://172.20.10.6`
    pub esp_base_url: String,
    /// Path of the event stream on the device
    pub events_path: String,
    /// SQLite database file
    pub db_path: String,
    /// Fixed wait before every reconnection attempt
    pub reconnect_delay: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Longest silence tolerated on an open stream before it counts as lost
    pub read_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process env in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key).with_context(|| format!("missing required env var: {key}"))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            esp_base_url: required("ESP_BASE_URL")?,
            events_path: optional("EVENTS_PATH", "/events"),
            db_path: optional("DB_PATH", "esp32_sse_data.sqlite3"),
            reconnect_delay: Duration::from_secs(
                optional("RECONNECT_DELAY_SECS", "3")
                    .parse()
                    .context("RECONNECT_DELAY_SECS must be a non-negative integer")?,
            ),
            connect_timeout: Duration::from_secs(
                optional("CONNECT_TIMEOUT_SECS", "10")
                    .parse()
                    .context("CONNECT_TIMEOUT_SECS must be a non-negative integer")?,
            ),
            read_timeout: Duration::from_secs(
                optional("READ_TIMEOUT_SECS", "60")
                    .parse()
                    .context("READ_TIMEOUT_SECS must be a non-negative integer")?,
            ),
        })
    }

    /// Full URL of the event stream.
    pub fn events_url(&self) -> String {
        let base = self.esp_base_url.trim_end_matches('/');
        if self.events_path.starts_with('/') {
            format!("{base}{}", self.events_path)
        } else {
            format!("{base}/{}", self.events_path)
        }
    }
}
