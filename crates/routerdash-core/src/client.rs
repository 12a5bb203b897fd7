//! HTTP backend for the device management API.

use serde::de::DeserializeOwned;

use crate::config::DashboardConfig;
use crate::device::{DeviceInfoBackend, FirmwareInfo, NetworkInfo, SystemInfo};
use crate::error::{Error, Result};
use crate::metrics::MetricsSnapshot;
use crate::mqtt::{CommandAck, MqttBackend, MqttStatus};
use crate::poller::MetricsBackend;
use crate::terminal::{CommandOutput, TerminalBackend};

/// Talks to a device at `base_url` over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("routerdash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await?;
        decode(url, response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        decode(url, response).await
    }
}

/// Non-2xx is a [`Error::Status`]; a body that is not the expected JSON is a
/// [`Error::Decode`].
async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            url,
        });
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

impl MetricsBackend for HttpBackend {
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot> {
        self.get_json("/api/metrics").await
    }
}

impl MqttBackend for HttpBackend {
    async fn mqtt_status(&self) -> Result<MqttStatus> {
        self.get_json("/api/mqtt/status").await
    }

    async fn start_mqtt(&self) -> Result<CommandAck> {
        self.post_json("/api/mqtt/start").await
    }

    async fn stop_mqtt(&self) -> Result<CommandAck> {
        self.post_json("/api/mqtt/stop").await
    }
}

impl DeviceInfoBackend for HttpBackend {
    async fn system_info(&self) -> Result<SystemInfo> {
        self.get_json("/api/system").await
    }

    async fn firmware_info(&self) -> Result<FirmwareInfo> {
        self.get_json("/api/firmware").await
    }

    async fn network_info(&self) -> Result<NetworkInfo> {
        self.get_json("/api/network").await
    }
}

impl TerminalBackend for HttpBackend {
    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        let url = self.url("/");
        let response = self
            .client
            .get(&url)
            .query(&[("command", command)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        decode(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpBackend::new(&DashboardConfig {
            base_url: "http://router.local:5000/".into(),
            ..DashboardConfig::default()
        })
        .unwrap();
        assert_eq!(backend.base_url(), "http://router.local:5000");
        assert_eq!(backend.url("/api/metrics"), "http://router.local:5000/api/metrics");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = HttpBackend::new(&DashboardConfig {
            base_url: "router.local".into(),
            ..DashboardConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn unreachable_device_is_transport_error() {
        let backend = HttpBackend::new(&DashboardConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..DashboardConfig::default()
        })
        .unwrap();
        let err = backend.fetch_metrics().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "{err}");
    }
}
