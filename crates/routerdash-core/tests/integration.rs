//! End-to-end flows through the public API with an in-memory device.

use std::sync::Mutex;
use std::time::Duration;

use routerdash_core::{
    BandwidthMetrics, CommandAck, CommandOutput, CpuMetrics, DashboardConfig,
    DashboardController, DashboardModel, DeviceInfoBackend, Error, ErrorSource, FirmwareInfo,
    FixedSpeeds, HISTORY_CAPACITY, HistorySeries, LinkStatus, MemoryMetrics, MetricsBackend,
    MetricsSnapshot, MqttBackend, MqttStatus, NetworkInfo, Phase, Result, SimulatedMaintenance,
    StorageMetrics, SystemInfo, TerminalBackend,
};
use tokio::runtime::Handle;

/// Replays scripted poll results, then repeats the last one.
struct Scripted {
    polls: Mutex<Vec<Result<f64>>>,
}

impl Scripted {
    fn new(mut script: Vec<Result<f64>>) -> Self {
        script.reverse();
        Self {
            polls: Mutex::new(script),
        }
    }
}

fn snapshot(cpu: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        cpu: CpuMetrics { usage: cpu },
        memory: MemoryMetrics {
            usage: 25.0,
            used: 256,
            total: 1024,
        },
        storage: StorageMetrics::from_megabytes(512, 512),
        bandwidth: BandwidthMetrics {
            download: 10.0,
            upload: 2.5,
        },
        internet: LinkStatus { connected: true },
        ultima_server: LinkStatus { connected: true },
    }
}

impl MetricsBackend for Scripted {
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot> {
        let mut polls = self.polls.lock().unwrap();
        let next = if polls.len() > 1 {
            polls.pop()
        } else {
            polls.last().map(|r| match r {
                Ok(v) => Ok(*v),
                Err(_) => Err(Error::Backend("still down".into())),
            })
        };
        next.unwrap_or_else(|| Err(Error::Backend("no script".into())))
            .map(snapshot)
    }
}

impl MqttBackend for Scripted {
    async fn mqtt_status(&self) -> Result<MqttStatus> {
        Err(Error::Backend("broker unreachable".into()))
    }

    async fn start_mqtt(&self) -> Result<CommandAck> {
        Ok(CommandAck { success: false })
    }

    async fn stop_mqtt(&self) -> Result<CommandAck> {
        Ok(CommandAck { success: true })
    }
}

impl DeviceInfoBackend for Scripted {
    async fn system_info(&self) -> Result<SystemInfo> {
        Ok(SystemInfo::default())
    }

    async fn firmware_info(&self) -> Result<FirmwareInfo> {
        Ok(FirmwareInfo::default())
    }

    async fn network_info(&self) -> Result<NetworkInfo> {
        Ok(NetworkInfo::default())
    }
}

impl TerminalBackend for Scripted {
    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            command: command.to_string(),
            output: String::new(),
            exit_status: 0,
        })
    }
}

fn setup(
    script: Vec<Result<f64>>,
) -> (
    DashboardController<Scripted, SimulatedMaintenance>,
    tokio::sync::mpsc::UnboundedReceiver<routerdash_core::DashboardEvent>,
    DashboardModel,
) {
    let config = DashboardConfig::default();
    let (controller, rx) = DashboardController::new(
        &config,
        Scripted::new(script),
        SimulatedMaintenance::default(),
        FixedSpeeds {
            download_mbps: 800.0,
            upload_mbps: 100.0,
        },
        Handle::current(),
    );
    let model = DashboardModel::new(config.window_len, HistorySeries::zeroed(), config.device_host());
    (controller, rx, model)
}

#[tokio::test(start_paused = true)]
async fn poll_failure_between_successes_keeps_last_values() {
    let (mut controller, mut rx, mut model) = setup(vec![
        Ok(10.0),
        Err(Error::Backend("timeout".into())),
        Ok(30.0),
    ]);
    controller.enter_dashboard();

    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(e) = rx.try_recv() {
        model.apply(e);
    }
    assert_eq!(model.cpu.text, "10%");

    tokio::time::sleep(Duration::from_millis(2000)).await;
    while let Ok(e) = rx.try_recv() {
        model.apply(e);
    }
    assert_eq!(model.cpu.text, "10%", "failed tick leaves display stale");
    assert_eq!(model.polls_failed, 1);
    assert!(model.poll_error.is_some());

    tokio::time::sleep(Duration::from_millis(2000)).await;
    while let Ok(e) = rx.try_recv() {
        model.apply(e);
    }
    assert_eq!(model.cpu.text, "30%");
    assert_eq!(model.poll_error, None, "recovered poll clears the banner");
    let window: Vec<f64> = model.cpu_window.iter().collect();
    assert_eq!(window.len(), 30);
    assert_eq!(&window[28..], &[10.0, 30.0]);
    controller.dispose();
}

#[tokio::test(start_paused = true)]
async fn back_to_back_runs_each_record_history() {
    let (mut controller, mut rx, mut model) = setup(vec![Ok(1.0)]);
    for expected_run in 1..=2 {
        model.open_speed_test();
        assert_eq!(controller.start_speed_test(), Some(expected_run));
        tokio::time::sleep(Duration::from_millis(5100)).await;
        while let Ok(e) = rx.try_recv() {
            model.apply(e);
        }
        assert_eq!(model.speed_test.phase, Phase::Done);
        model.close_speed_test();
        assert!(controller.reset_speed_test());
    }
    let last = model.last_speed_test.expect("result kept after close");
    assert_eq!((last.download_mbps, last.upload_mbps), (800.0, 100.0));
    let recorded: Vec<_> = model.history.iter().rev().take(2).collect();
    assert!(recorded.iter().all(|s| s.download_mbps == 80.0 && s.upload_mbps == 10.0));
    assert_eq!(model.history.len(), HISTORY_CAPACITY);
}

#[tokio::test(start_paused = true)]
async fn cancel_then_restart_ignores_old_run() {
    let (mut controller, mut rx, mut model) = setup(vec![Ok(1.0)]);
    model.open_speed_test();
    controller.start_speed_test();
    tokio::time::sleep(Duration::from_millis(3050)).await;
    assert_eq!(controller.cancel_speed_test(), Some(1));
    assert_eq!(controller.start_speed_test(), Some(2));
    tokio::time::sleep(Duration::from_millis(550)).await;
    while let Ok(e) = rx.try_recv() {
        model.apply(e);
    }
    assert_eq!(model.speed_test.active_run, Some(2));
    assert_eq!(model.speed_test.phase, Phase::Downloading);
    assert_eq!(model.speed_test.progress, 10);
    assert_eq!(model.speed_test.download_mbps, None);
    controller.dispose();
}

#[tokio::test(start_paused = true)]
async fn mqtt_failures_are_contained() {
    let (controller, mut rx, mut model) = setup(vec![Ok(1.0)]);
    controller.refresh_mqtt();
    controller.start_mqtt();
    tokio::time::sleep(Duration::from_millis(10)).await;
    while let Ok(e) = rx.try_recv() {
        model.apply(e);
    }
    assert!(!model.mqtt.connected);
    assert!(model.mqtt.start_enabled());
    assert!(matches!(model.last_error, Some((ErrorSource::Mqtt, _))));
    assert_eq!(model.poll_error, None);
}
