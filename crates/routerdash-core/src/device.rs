//! Static device information and the developer API reference.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Body of `GET /api/system`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(rename = "openwrt_version")]
    pub os_version: String,
    pub kernel_version: String,
    pub uptime: String,
    pub cpu_info: String,
}

/// Body of `GET /api/firmware`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub version: String,
    pub build_date: String,
    pub architecture: String,
    pub status: String,
    #[serde(default)]
    pub update_available: bool,
}

/// Body of `GET /api/network`; each field is newline-separated tool output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interfaces: String,
    pub ip_addresses: String,
    pub routing: String,
}

/// Read-only device information endpoints.
pub trait DeviceInfoBackend: Send + Sync + 'static {
    fn system_info(&self) -> impl Future<Output = Result<SystemInfo>> + Send;
    fn firmware_info(&self) -> impl Future<Output = Result<FirmwareInfo>> + Send;
    fn network_info(&self) -> impl Future<Output = Result<NetworkInfo>> + Send;
}

/// One row of the developer API reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    /// Documented but not invoked by the dashboard.
    pub stub: bool,
}

const fn endpoint(method: &'static str, path: &'static str, summary: &'static str) -> ApiEndpoint {
    ApiEndpoint {
        method,
        path,
        summary,
        stub: false,
    }
}

const fn stub(method: &'static str, path: &'static str, summary: &'static str) -> ApiEndpoint {
    ApiEndpoint {
        method,
        path,
        summary,
        stub: true,
    }
}

/// Endpoints listed in the developer panel.
pub const API_ENDPOINTS: &[ApiEndpoint] = &[
    endpoint("GET", "/api/metrics", "CPU, memory, storage, bandwidth and link status"),
    endpoint("GET", "/api/system", "OS and kernel version, uptime, CPU model"),
    endpoint("GET", "/api/network", "Interfaces, addresses and routing table"),
    endpoint("GET", "/api/firmware", "Installed firmware and update availability"),
    endpoint("GET", "/api/mqtt/status", "Broker state and message counters"),
    endpoint("POST", "/api/mqtt/start", "Start the MQTT broker"),
    endpoint("POST", "/api/mqtt/stop", "Stop the MQTT broker"),
    endpoint("GET", "/?command=<cmd>", "Run a console command and capture its output"),
    stub("POST", "/api/system/factory-reset", "Restore factory defaults"),
    stub("POST", "/api/system/backup", "Download a configuration backup"),
    stub("POST", "/api/firmware/update", "Upload and flash a firmware image"),
];
