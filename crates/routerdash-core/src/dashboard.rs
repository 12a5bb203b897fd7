//! Dashboard events and the view model they drive.
//!
//! Everything asynchronous (polls, speed-test ticks, MQTT and maintenance
//! calls) reports back as a [`DashboardEvent`]. [`DashboardModel::apply`] is
//! the only place those events turn into displayed state, so a renderer just
//! drains the channel, applies, and paints the model.

use std::collections::HashMap;

use crate::bandwidth::{Phase, RunId, TestEvent};
use crate::device::{FirmwareInfo, NetworkInfo, SystemInfo};
use crate::history::HistorySeries;
use crate::maintenance::{MaintenanceKind, ValidationError};
use crate::metrics::{
    BandwidthMetrics, LinkStatus, MemoryMetrics, MetricsSnapshot, Percent, StorageMetrics,
    bar_width,
};
use crate::mqtt::{CommandAck, MqttPanel, MqttStatus};
use crate::terminal::{CommandOutput, TerminalView};
use crate::window::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttCommand {
    Start,
    Stop,
}

/// Result of asynchronous dashboard work.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Metrics(MetricsSnapshot),
    /// A poll failed; displayed metrics stay as they were.
    PollFailed(String),
    SpeedTest {
        run: RunId,
        event: TestEvent,
    },
    /// Status check result; `None` when the request failed.
    MqttStatus(Option<MqttStatus>),
    MqttCommand {
        command: MqttCommand,
        outcome: Result<CommandAck, String>,
    },
    MaintenanceStarted(MaintenanceKind),
    MaintenanceFinished {
        kind: MaintenanceKind,
        outcome: Result<String, String>,
    },
    SystemInfo(SystemInfo),
    FirmwareInfo(FirmwareInfo),
    NetworkInfo(NetworkInfo),
    /// A device info request failed.
    DeviceInfoFailed(String),
    /// A console command was sent to the device.
    CommandSent(String),
    CommandFinished(CommandOutput),
}

/// Where a non-poll error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Mqtt,
    DeviceInfo,
}

impl ErrorSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mqtt => "MQTT",
            Self::DeviceInfo => "device info",
        }
    }
}

/// Frozen readouts of the last completed speed test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedTestResult {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: Option<u32>,
}

/// Percentage readout with its text and bar width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UsageReadout {
    pub percent: Percent,
    /// `"42.5%"`
    pub text: String,
    /// Secondary line such as `"512MB / 1024MB"`.
    pub details: String,
    /// Clamped to `0..=100`.
    pub bar: f64,
}

impl UsageReadout {
    fn set(&mut self, percent: Percent, details: String) {
        self.percent = percent;
        self.text = format!("{percent}%");
        self.details = details;
        self.bar = bar_width(percent);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandwidthReadout {
    pub download: f64,
    pub upload: f64,
    /// `"12.3 KB/s"`
    pub download_text: String,
    pub upload_text: String,
}

/// Connection indicator; unknown until the first snapshot arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkIndicator {
    pub connected: Option<bool>,
}

impl LinkIndicator {
    pub fn label(self) -> &'static str {
        match self.connected {
            Some(true) => "Connected",
            Some(false) => "Disconnected",
            None => "Unknown",
        }
    }
}

/// Popup state of the bandwidth test.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeedTestView {
    pub open: bool,
    /// Run whose events are currently displayed.
    pub active_run: Option<RunId>,
    pub phase: Phase,
    pub progress: u8,
    pub current_mbps: f64,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<u32>,
    /// Runs up to and including this id are finished or cancelled.
    retired_through: RunId,
}

impl SpeedTestView {
    pub fn start_enabled(&self) -> bool {
        !self.phase.is_active()
    }

    pub fn start_label(&self) -> &'static str {
        match self.phase {
            Phase::Idle => "Start Test",
            Phase::Downloading | Phase::Uploading => "Testing...",
            Phase::Done => "Run Again",
        }
    }

    fn clear_readouts(&mut self) {
        self.phase = Phase::Idle;
        self.progress = 0;
        self.current_mbps = 0.0;
        self.download_mbps = None;
        self.upload_mbps = None;
        self.ping_ms = None;
    }
}

/// State of one maintenance dialog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaintenanceState {
    #[default]
    Idle,
    InProgress,
    Succeeded(String),
    Failed(String),
}

/// Presentation state of the whole dashboard.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    pub cpu_window: RollingWindow,
    pub memory_window: RollingWindow,
    pub cpu: UsageReadout,
    pub memory: UsageReadout,
    pub storage: UsageReadout,
    /// `(used, free)` megabytes for the storage split chart.
    pub storage_split: (u64, u64),
    pub bandwidth: BandwidthReadout,
    pub internet: LinkIndicator,
    pub ultima_server: LinkIndicator,
    pub speed_test: SpeedTestView,
    pub history: HistorySeries,
    pub mqtt: MqttPanel,
    pub maintenance: HashMap<MaintenanceKind, MaintenanceState>,
    pub system: Option<SystemInfo>,
    pub firmware: Option<FirmwareInfo>,
    pub network: Option<NetworkInfo>,
    pub terminal: TerminalView,
    /// Survives reopening the speed-test popup.
    pub last_speed_test: Option<SpeedTestResult>,
    /// Cleared by the next successful poll.
    pub poll_error: Option<String>,
    /// Most recent MQTT or device info failure.
    pub last_error: Option<(ErrorSource, String)>,
    pub polls_ok: u64,
    pub polls_failed: u64,
}

impl DashboardModel {
    pub fn new(window_len: usize, history: HistorySeries, device_host: &str) -> Self {
        Self {
            cpu_window: RollingWindow::new(window_len),
            memory_window: RollingWindow::new(window_len),
            cpu: UsageReadout::default(),
            memory: UsageReadout::default(),
            storage: UsageReadout::default(),
            storage_split: (0, 0),
            bandwidth: BandwidthReadout::default(),
            internet: LinkIndicator::default(),
            ultima_server: LinkIndicator::default(),
            speed_test: SpeedTestView::default(),
            history,
            mqtt: MqttPanel::new(device_host),
            maintenance: HashMap::new(),
            system: None,
            firmware: None,
            network: None,
            terminal: TerminalView::default(),
            last_speed_test: None,
            poll_error: None,
            last_error: None,
            polls_ok: 0,
            polls_failed: 0,
        }
    }

    pub fn apply(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Metrics(snapshot) => self.apply_snapshot(snapshot),
            DashboardEvent::PollFailed(msg) => {
                self.polls_failed += 1;
                self.poll_error = Some(msg);
            }
            DashboardEvent::SpeedTest { run, event } => self.apply_speed_test(run, event),
            DashboardEvent::MqttStatus(status) => self.mqtt.apply_status(status.as_ref()),
            DashboardEvent::MqttCommand { command, outcome } => match outcome {
                Ok(ack) => {
                    let applied = match command {
                        MqttCommand::Start => self.mqtt.apply_start(&ack),
                        MqttCommand::Stop => self.mqtt.apply_stop(&ack),
                    };
                    if !applied {
                        self.last_error =
                            Some((ErrorSource::Mqtt, format!("broker refused {command:?}")));
                    }
                }
                Err(msg) => self.last_error = Some((ErrorSource::Mqtt, msg)),
            },
            DashboardEvent::MaintenanceStarted(kind) => {
                self.maintenance.insert(kind, MaintenanceState::InProgress);
            }
            DashboardEvent::MaintenanceFinished { kind, outcome } => {
                let state = match outcome {
                    Ok(msg) => MaintenanceState::Succeeded(msg),
                    Err(msg) => MaintenanceState::Failed(msg),
                };
                self.maintenance.insert(kind, state);
            }
            DashboardEvent::SystemInfo(info) => self.system = Some(info),
            DashboardEvent::FirmwareInfo(info) => self.firmware = Some(info),
            DashboardEvent::NetworkInfo(info) => self.network = Some(info),
            DashboardEvent::DeviceInfoFailed(msg) => {
                self.last_error = Some((ErrorSource::DeviceInfo, msg));
            }
            DashboardEvent::CommandSent(command) => self.terminal.sent(command),
            DashboardEvent::CommandFinished(output) => self.terminal.finished(output),
        }
    }

    /// Show a dialog validation failure without submitting anything.
    pub fn reject_maintenance(&mut self, kind: MaintenanceKind, err: &ValidationError) {
        self.maintenance
            .insert(kind, MaintenanceState::Failed(err.to_string()));
    }

    pub fn maintenance_state(&self, kind: MaintenanceKind) -> &MaintenanceState {
        static IDLE: MaintenanceState = MaintenanceState::Idle;
        self.maintenance.get(&kind).unwrap_or(&IDLE)
    }

    /// Open the speed-test popup with fresh readouts.
    pub fn open_speed_test(&mut self) {
        self.speed_test.open = true;
        if !self.speed_test.phase.is_active() {
            self.speed_test.clear_readouts();
        }
    }

    pub fn close_speed_test(&mut self) {
        self.speed_test.open = false;
    }

    fn apply_snapshot(&mut self, s: MetricsSnapshot) {
        self.polls_ok += 1;
        self.poll_error = None;
        self.update_cpu(s.cpu.usage);
        self.update_memory(&s.memory);
        self.update_storage(&s.storage);
        self.update_bandwidth(&s.bandwidth);
        self.update_links(s.internet, s.ultima_server);
    }

    fn update_cpu(&mut self, usage: Percent) {
        self.cpu_window.push(usage);
        self.cpu.set(usage, String::new());
    }

    fn update_memory(&mut self, m: &MemoryMetrics) {
        self.memory_window.push(m.usage);
        self.memory
            .set(m.usage, format!("{}MB / {}MB", m.used, m.total));
    }

    fn update_storage(&mut self, s: &StorageMetrics) {
        self.storage_split = (s.used, s.free);
        self.storage.set(
            s.usage,
            format!("{} / {}", s.used_formatted, s.total_formatted),
        );
    }

    fn update_bandwidth(&mut self, b: &BandwidthMetrics) {
        self.bandwidth = BandwidthReadout {
            download: b.download,
            upload: b.upload,
            download_text: format!("{} KB/s", b.download),
            upload_text: format!("{} KB/s", b.upload),
        };
    }

    fn update_links(&mut self, internet: LinkStatus, ultima: LinkStatus) {
        self.internet.connected = Some(internet.connected);
        self.ultima_server.connected = Some(ultima.connected);
    }

    fn apply_speed_test(&mut self, run: RunId, event: TestEvent) {
        let view = &mut self.speed_test;
        if run <= view.retired_through {
            log::debug!("dropping stale speed test event from run {run}");
            return;
        }
        if let TestEvent::Started = event {
            view.active_run = Some(run);
            view.clear_readouts();
            view.phase = Phase::Downloading;
            return;
        }
        if view.active_run != Some(run) {
            log::debug!("dropping speed test event for inactive run {run}");
            return;
        }
        match event {
            TestEvent::Started => {}
            TestEvent::Progress {
                phase,
                progress,
                current_mbps,
            } => {
                view.phase = phase;
                view.progress = progress;
                view.current_mbps = current_mbps;
            }
            TestEvent::Ping { ms } => view.ping_ms = Some(ms),
            TestEvent::DownloadComplete { mbps } => {
                view.download_mbps = Some(mbps);
                view.phase = Phase::Uploading;
            }
            TestEvent::UploadComplete { mbps } => view.upload_mbps = Some(mbps),
            TestEvent::Completed { sample } => {
                if let (Some(download_mbps), Some(upload_mbps)) =
                    (view.download_mbps, view.upload_mbps)
                {
                    self.last_speed_test = Some(SpeedTestResult {
                        download_mbps,
                        upload_mbps,
                        ping_ms: view.ping_ms,
                    });
                }
                view.phase = Phase::Done;
                view.active_run = None;
                view.retired_through = run;
                self.history.record(sample);
            }
            TestEvent::Cancelled => {
                view.clear_readouts();
                view.active_run = None;
                view.retired_through = run;
            }
        }
    }
}

impl Default for DashboardModel {
    fn default() -> Self {
        Self::new(
            crate::window::DEFAULT_WINDOW_LEN,
            HistorySeries::zeroed(),
            "127.0.0.1",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{BandwidthSample, HISTORY_CAPACITY};
    use crate::metrics::{BandwidthMetrics, CpuMetrics};

    fn snapshot(cpu: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            cpu: CpuMetrics { usage: cpu },
            memory: MemoryMetrics {
                usage: 50.0,
                used: 512,
                total: 1024,
            },
            storage: StorageMetrics::from_megabytes(1024, 3072),
            bandwidth: BandwidthMetrics {
                download: 12.3,
                upload: 4.5,
            },
            internet: LinkStatus { connected: true },
            ultima_server: LinkStatus { connected: false },
        }
    }

    fn speed(run: RunId, event: TestEvent) -> DashboardEvent {
        DashboardEvent::SpeedTest { run, event }
    }

    #[test]
    fn snapshot_updates_every_group() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::Metrics(snapshot(42.5)));
        assert_eq!(m.cpu.text, "42.5%");
        assert_eq!(m.cpu_window.latest(), 42.5);
        assert_eq!(m.memory.text, "50%");
        assert_eq!(m.memory.details, "512MB / 1024MB");
        assert_eq!(m.storage.details, "1.0 GB / 4.0 GB");
        assert_eq!(m.storage_split, (1024, 3072));
        assert_eq!(m.bandwidth.download_text, "12.3 KB/s");
        assert_eq!(m.bandwidth.upload_text, "4.5 KB/s");
        assert_eq!(m.internet.label(), "Connected");
        assert_eq!(m.ultima_server.label(), "Disconnected");
        assert_eq!(m.polls_ok, 1);
    }

    #[test]
    fn window_length_constant_across_polls() {
        let mut m = DashboardModel::default();
        for i in 0..100 {
            m.apply(DashboardEvent::Metrics(snapshot(i as f64)));
        }
        assert_eq!(m.cpu_window.len(), 30);
        assert_eq!(m.memory_window.len(), 30);
    }

    #[test]
    fn out_of_range_usage_bar_is_clamped() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::Metrics(snapshot(130.0)));
        assert_eq!(m.cpu.text, "130%");
        assert_eq!(m.cpu.bar, 100.0);
    }

    #[test]
    fn failed_poll_keeps_previous_values() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::Metrics(snapshot(10.0)));
        m.apply(DashboardEvent::PollFailed("connection refused".into()));
        assert_eq!(m.cpu.text, "10%");
        assert_eq!(m.cpu_window.latest(), 10.0);
        assert_eq!(m.polls_failed, 1);
        assert_eq!(m.poll_error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn successful_poll_clears_poll_error() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::PollFailed("connection refused".into()));
        m.apply(DashboardEvent::Metrics(snapshot(20.0)));
        assert_eq!(m.poll_error, None);
        assert_eq!(m.last_error, None);
    }

    #[test]
    fn command_errors_are_not_poll_errors() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::MqttCommand {
            command: MqttCommand::Start,
            outcome: Err("timeout".into()),
        });
        m.apply(DashboardEvent::Metrics(snapshot(20.0)));
        assert_eq!(m.poll_error, None);
        assert_eq!(m.last_error, Some((ErrorSource::Mqtt, "timeout".to_string())));

        m.apply(DashboardEvent::DeviceInfoFailed("HTTP 500".into()));
        assert_eq!(m.last_error.map(|(src, _)| src), Some(ErrorSource::DeviceInfo));
    }

    #[test]
    fn completed_run_records_history() {
        let mut m = DashboardModel::default();
        m.apply(speed(1, TestEvent::Started));
        m.apply(speed(
            1,
            TestEvent::Completed {
                sample: BandwidthSample {
                    download_mbps: 80.0,
                    upload_mbps: 10.0,
                },
            },
        ));
        assert_eq!(m.history.len(), HISTORY_CAPACITY);
        assert_eq!(m.history.latest().unwrap().download_mbps, 80.0);
        assert_eq!(m.speed_test.start_label(), "Run Again");
        assert!(m.speed_test.start_enabled());
    }

    #[test]
    fn cancelled_run_leaves_history_and_drops_stragglers() {
        let mut m = DashboardModel::default();
        let before = m.history.clone();
        m.apply(speed(1, TestEvent::Started));
        m.apply(speed(
            1,
            TestEvent::Progress {
                phase: Phase::Downloading,
                progress: 10,
                current_mbps: 160.0,
            },
        ));
        m.apply(speed(1, TestEvent::Cancelled));
        assert_eq!(m.speed_test.phase, Phase::Idle);
        m.apply(speed(
            1,
            TestEvent::Progress {
                phase: Phase::Downloading,
                progress: 12,
                current_mbps: 192.0,
            },
        ));
        assert_eq!(m.speed_test.progress, 0);
        m.apply(speed(
            1,
            TestEvent::Completed {
                sample: BandwidthSample {
                    download_mbps: 1.0,
                    upload_mbps: 1.0,
                },
            },
        ));
        assert_eq!(m.history, before);
    }

    #[test]
    fn events_for_other_run_are_ignored() {
        let mut m = DashboardModel::default();
        m.apply(speed(2, TestEvent::Started));
        m.apply(speed(1, TestEvent::Ping { ms: 3 }));
        assert_eq!(m.speed_test.ping_ms, None);
        m.apply(speed(2, TestEvent::Ping { ms: 3 }));
        assert_eq!(m.speed_test.ping_ms, Some(3));
    }

    #[test]
    fn mqtt_events_drive_panel() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::MqttStatus(Some(MqttStatus {
            running: true,
            clients: 3,
            published: 0,
            received: 0,
        })));
        assert_eq!(m.mqtt.clients, 3);
        assert!(m.mqtt.stop_enabled());
        m.apply(DashboardEvent::MqttCommand {
            command: MqttCommand::Stop,
            outcome: Err("timeout".into()),
        });
        assert!(m.mqtt.connected);
        m.apply(DashboardEvent::MqttStatus(None));
        assert!(m.mqtt.start_enabled());
    }

    #[test]
    fn maintenance_lifecycle() {
        let mut m = DashboardModel::default();
        assert_eq!(m.maintenance_state(MaintenanceKind::Backup), &MaintenanceState::Idle);
        m.reject_maintenance(MaintenanceKind::Backup, &ValidationError::PasswordMismatch);
        assert!(matches!(
            m.maintenance_state(MaintenanceKind::Backup),
            MaintenanceState::Failed(_)
        ));
        m.apply(DashboardEvent::MaintenanceStarted(MaintenanceKind::Backup));
        m.apply(DashboardEvent::MaintenanceFinished {
            kind: MaintenanceKind::Backup,
            outcome: Ok("Backup created.".into()),
        });
        assert_eq!(
            m.maintenance_state(MaintenanceKind::Backup),
            &MaintenanceState::Succeeded("Backup created.".into())
        );
    }

    #[test]
    fn reopening_popup_after_done_clears_readouts() {
        let mut m = DashboardModel::default();
        m.apply(speed(1, TestEvent::Started));
        m.apply(speed(1, TestEvent::DownloadComplete { mbps: 800.0 }));
        m.apply(speed(
            1,
            TestEvent::Completed {
                sample: BandwidthSample {
                    download_mbps: 80.0,
                    upload_mbps: 10.0,
                },
            },
        ));
        m.close_speed_test();
        m.open_speed_test();
        assert!(m.speed_test.open);
        assert_eq!(m.speed_test.phase, Phase::Idle);
        assert_eq!(m.speed_test.download_mbps, None);
    }

    #[test]
    fn last_result_survives_reopening_popup() {
        let mut m = DashboardModel::default();
        m.apply(speed(1, TestEvent::Started));
        m.apply(speed(1, TestEvent::Ping { ms: 3 }));
        m.apply(speed(1, TestEvent::DownloadComplete { mbps: 800.0 }));
        m.apply(speed(1, TestEvent::UploadComplete { mbps: 100.0 }));
        m.apply(speed(
            1,
            TestEvent::Completed {
                sample: BandwidthSample {
                    download_mbps: 80.0,
                    upload_mbps: 10.0,
                },
            },
        ));
        m.close_speed_test();
        m.open_speed_test();
        assert_eq!(
            m.last_speed_test,
            Some(SpeedTestResult {
                download_mbps: 800.0,
                upload_mbps: 100.0,
                ping_ms: Some(3),
            })
        );
    }

    #[test]
    fn console_events_fill_terminal_view() {
        let mut m = DashboardModel::default();
        m.apply(DashboardEvent::CommandSent("uptime".into()));
        assert!(m.terminal.is_busy());
        assert_eq!(m.terminal.history.recall(1), Some("uptime"));
        m.apply(DashboardEvent::CommandFinished(CommandOutput {
            command: "uptime".into(),
            output: "up 3 days".into(),
            exit_status: 0,
        }));
        assert!(!m.terminal.is_busy());
        assert_eq!(m.terminal.transcript().count(), 1);
    }
}
