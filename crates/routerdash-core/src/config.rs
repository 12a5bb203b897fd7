//! Dashboard and mock server configuration.

use std::time::Duration;

use crate::bandwidth::TICK_INTERVAL;
use crate::error::{Error, Result};
use crate::window::DEFAULT_WINDOW_LEN;

/// Default device API base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default metrics poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Settings for a dashboard session.
///
/// # Example
/// ```
/// use routerdash_core::DashboardConfig;
/// use std::time::Duration;
///
/// let config = DashboardConfig {
///     base_url: "http://192.168.1.1:5000".into(),
///     poll_interval: Duration::from_secs(5),
///     ..DashboardConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Device API root; `/api/...` paths are appended to it.
    ///
    /// **Default:** `http://127.0.0.1:5000`
    pub base_url: String,

    /// Delay between metrics polls. The first poll fires immediately.
    ///
    /// **Default:** 2000 ms
    pub poll_interval: Duration,

    /// Delay between bandwidth test progress ticks.
    ///
    /// **Default:** 100 ms
    pub speed_test_tick: Duration,

    /// Number of samples on the CPU/memory charts.
    ///
    /// **Default:** `30`
    pub window_len: usize,

    /// Per-request timeout for the HTTP backend.
    ///
    /// **Default:** 5 s
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            speed_test_tick: TICK_INTERVAL,
            window_len: DEFAULT_WINDOW_LEN,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://, got {url:?}"
            )));
        }
        if url
            .split_once("://")
            .is_none_or(|(_, rest)| rest.trim_matches('/').is_empty())
        {
            return Err(Error::Config("base URL has no host".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        if self.speed_test_tick.is_zero() {
            return Err(Error::Config("speed test tick must be positive".into()));
        }
        if self.window_len == 0 {
            return Err(Error::Config("chart window must hold at least one sample".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be positive".into()));
        }
        Ok(())
    }

    /// Host part of the base URL, shown as the MQTT broker address.
    pub fn device_host(&self) -> &str {
        let rest = self
            .base_url
            .split_once("://")
            .map_or(self.base_url.as_str(), |(_, rest)| rest);
        let authority = rest.split('/').next().unwrap_or(rest);
        match authority.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => authority,
        }
    }
}

/// Bind address of the mock device server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// **Default:** `0.0.0.0`
    pub host: String,
    /// **Default:** `5000`
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
