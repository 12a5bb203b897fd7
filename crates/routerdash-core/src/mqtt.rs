//! MQTT broker status and the panel that displays it.
//!
//! The device keeps a flag-only broker state behind `GET /api/mqtt/status`,
//! `POST /api/mqtt/start` and `POST /api/mqtt/stop`. [`MqttPanel`] mirrors it
//! and decides which of the start/stop controls are enabled.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Port the broker listens on; shown next to the device host.
pub const MQTT_PORT: u16 = 1883;

/// Body of `GET /api/mqtt/status`. Missing counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub clients: u32,
    #[serde(default)]
    pub published: u64,
    #[serde(default)]
    pub received: u64,
}

/// Body of the start/stop endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub success: bool,
}

/// Remote broker control.
pub trait MqttBackend: Send + Sync + 'static {
    fn mqtt_status(&self) -> impl Future<Output = Result<MqttStatus>> + Send;
    fn start_mqtt(&self) -> impl Future<Output = Result<CommandAck>> + Send;
    fn stop_mqtt(&self) -> impl Future<Output = Result<CommandAck>> + Send;
}

/// Presentation state of the MQTT status popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPanel {
    pub connected: bool,
    pub clients: u32,
    pub published: u64,
    pub received: u64,
    /// `<device host>:1883`
    pub broker_address: String,
}

impl MqttPanel {
    pub fn new(device_host: &str) -> Self {
        Self {
            connected: false,
            clients: 0,
            published: 0,
            received: 0,
            broker_address: format!("{device_host}:{MQTT_PORT}"),
        }
    }

    pub fn start_enabled(&self) -> bool {
        !self.connected
    }

    pub fn stop_enabled(&self) -> bool {
        self.connected
    }

    pub fn status_label(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else {
            "Disconnected"
        }
    }

    /// Apply a status check. `None` is a failed request and reads as stopped;
    /// counters are only refreshed from a running broker.
    pub fn apply_status(&mut self, status: Option<&MqttStatus>) {
        match status {
            Some(s) if s.running => {
                self.connected = true;
                self.clients = s.clients;
                self.published = s.published;
                self.received = s.received;
            }
            _ => self.connected = false,
        }
    }

    /// A successful start resets the counters; anything else changes nothing.
    pub fn apply_start(&mut self, ack: &CommandAck) -> bool {
        if !ack.success {
            return false;
        }
        self.connected = true;
        self.clients = 0;
        self.published = 0;
        self.received = 0;
        true
    }

    pub fn apply_stop(&mut self, ack: &CommandAck) -> bool {
        if !ack.success {
            return false;
        }
        self.connected = false;
        true
    }
}

impl Default for MqttPanel {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}
