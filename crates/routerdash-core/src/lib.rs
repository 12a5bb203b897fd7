//! # routerdash-core
//!
//! Live dashboard engine for router management APIs.
//!
//! Polls a device's `/api/metrics` endpoint, scrolls CPU and memory samples
//! through fixed-width chart windows, runs a simulated two-phase bandwidth
//! test, and drives the MQTT and maintenance panels. Nothing here draws
//! anything: every asynchronous result arrives as a [`DashboardEvent`] and
//! [`DashboardModel`] holds the state a renderer paints.
//!
//! ## Quick Start
//!
//! ```no_run
//! use routerdash_core::{
//!     DashboardConfig, DashboardController, DashboardModel, HistorySeries, HttpBackend,
//!     RandomSpeeds, SimulatedMaintenance,
//! };
//!
//! # async fn demo() -> routerdash_core::Result<()> {
//! let config = DashboardConfig::default();
//! let backend = HttpBackend::new(&config)?;
//! let (mut controller, mut events) = DashboardController::new(
//!     &config,
//!     backend,
//!     SimulatedMaintenance::default(),
//!     RandomSpeeds::from_os_rng(),
//!     tokio::runtime::Handle::current(),
//! );
//! let mut model = DashboardModel::new(config.window_len, HistorySeries::zeroed(), config.device_host());
//!
//! controller.enter_dashboard();
//! while let Some(event) = events.recv().await {
//!     model.apply(event);
//!     println!("CPU {}", model.cpu.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Backend traits → Poller / speed-test ticker → `DashboardEvent` channel → `DashboardModel`
//!
//! The device is reached through [`MetricsBackend`], [`MqttBackend`],
//! [`DeviceInfoBackend`] and [`TerminalBackend`] ([`HttpBackend`] implements
//! all four). Maintenance work goes through [`MaintenanceBackend`] and
//! speed-test targets come from a [`SpeedSource`].

pub mod bandwidth;
pub mod client;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod device;
pub mod error;
pub mod history;
pub mod maintenance;
pub mod metrics;
pub mod mqtt;
pub mod poller;
pub mod terminal;
pub mod window;

pub use bandwidth::{
    BandwidthTest, FixedSpeeds, Phase, RandomSpeeds, RunId, SIMULATED_PING_MS, SpeedSource,
    TestEvent, TestRun, interpolate,
};
pub use client::HttpBackend;
pub use config::{DashboardConfig, ServerConfig};
pub use controller::{DashboardController, DeviceApi};
pub use dashboard::{
    DashboardEvent, DashboardModel, ErrorSource, LinkIndicator, MaintenanceState, MqttCommand,
    SpeedTestResult, SpeedTestView, UsageReadout,
};
pub use device::{API_ENDPOINTS, ApiEndpoint, DeviceInfoBackend, FirmwareInfo, NetworkInfo, SystemInfo};
pub use error::{Error, Result};
pub use history::{BandwidthSample, HISTORY_CAPACITY, HistorySeries};
pub use maintenance::{
    BackupOptions, BackupRequest, FactoryResetRequest, FirmwareUpdateRequest, MaintenanceAction,
    MaintenanceBackend, MaintenanceKind, SimulatedMaintenance, ValidationError,
};
pub use metrics::{
    BandwidthMetrics, CpuMetrics, LinkStatus, MemoryMetrics, MetricsSnapshot, Percent,
    StorageMetrics, format_megabytes,
};
pub use mqtt::{CommandAck, MQTT_PORT, MqttBackend, MqttPanel, MqttStatus};
pub use poller::{MetricsBackend, MetricsPoller};
pub use terminal::{
    COMMAND_HISTORY_LEN, CommandHistory, CommandOutput, TerminalBackend, TerminalView,
    normalize_command,
};
pub use window::{DEFAULT_WINDOW_LEN, RollingWindow};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
