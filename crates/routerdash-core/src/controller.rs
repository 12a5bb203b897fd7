//! Dashboard lifecycle: owns the poller, the speed-test ticker and the
//! backends, and reports every asynchronous result as a [`DashboardEvent`].
//!
//! A controller is created when the dashboard view is entered and disposed
//! when it is left. All timers it starts are tied to it; dropping it cancels
//! them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::bandwidth::{BandwidthTest, RunId, SpeedSource, TestEvent, TestRun};
use crate::config::DashboardConfig;
use crate::dashboard::{DashboardEvent, MqttCommand};
use crate::device::DeviceInfoBackend;
use crate::maintenance::{MaintenanceAction, MaintenanceBackend, ValidationError};
use crate::mqtt::MqttBackend;
use crate::poller::{MetricsBackend, MetricsPoller};
use crate::terminal::{CommandOutput, TerminalBackend, normalize_command};

/// Everything the dashboard needs from the device.
pub trait DeviceApi: MetricsBackend + MqttBackend + DeviceInfoBackend + TerminalBackend {}

impl<T: MetricsBackend + MqttBackend + DeviceInfoBackend + TerminalBackend> DeviceApi for T {}

pub struct DashboardController<B, M> {
    backend: Arc<B>,
    maintenance: Arc<M>,
    runtime: Handle,
    events: UnboundedSender<DashboardEvent>,
    poller: MetricsPoller<B>,
    speed_test: Arc<Mutex<BandwidthTest>>,
    speed_test_tick: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl<B: DeviceApi, M: MaintenanceBackend> DashboardController<B, M> {
    /// Build a controller and the receiver its events arrive on.
    pub fn new(
        config: &DashboardConfig,
        backend: B,
        maintenance: M,
        speeds: impl SpeedSource + 'static,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<DashboardEvent>) {
        let (events, rx) = unbounded_channel();
        let backend = Arc::new(backend);
        let poller = MetricsPoller::new(
            backend.clone(),
            config.poll_interval,
            events.clone(),
            runtime.clone(),
        );
        let controller = Self {
            backend,
            maintenance: Arc::new(maintenance),
            runtime,
            events,
            poller,
            speed_test: Arc::new(Mutex::new(BandwidthTest::new(speeds))),
            speed_test_tick: config.speed_test_tick,
            ticker: None,
        };
        (controller, rx)
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Start the metrics poller.
    pub fn enter_dashboard(&mut self) {
        self.poller.start();
    }

    /// Stop the metrics poller. Speed tests are unaffected.
    pub fn leave_dashboard(&mut self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Start a bandwidth test. Returns `None`, changing nothing, while a
    /// test is already running.
    pub fn start_speed_test(&mut self) -> Option<RunId> {
        let mut test = lock(&self.speed_test);
        let started = test.start()?;
        let run = test.run_id();
        for event in started {
            self.emit(DashboardEvent::SpeedTest { run, event });
        }
        drop(test);

        if let Some(old) = self.ticker.take() {
            old.abort();
        }
        log::debug!("speed test run {run} started");
        self.ticker = Some(self.runtime.spawn(drive_speed_test(
            self.speed_test.clone(),
            run,
            self.speed_test_tick,
            self.events.clone(),
        )));
        Some(run)
    }

    /// Cancel a running bandwidth test without recording history. Returns
    /// the cancelled run, if one was active.
    pub fn cancel_speed_test(&mut self) -> Option<RunId> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let mut test = lock(&self.speed_test);
        if !test.cancel() {
            return None;
        }
        let run = test.run_id();
        self.emit(DashboardEvent::SpeedTest {
            run,
            event: TestEvent::Cancelled,
        });
        log::debug!("speed test run {run} cancelled");
        Some(run)
    }

    /// Clear a finished run so a reopened popup starts from Idle. A running
    /// test is left alone; returns whether anything was reset.
    pub fn reset_speed_test(&self) -> bool {
        lock(&self.speed_test).reset()
    }

    /// Snapshot of the current test state.
    pub fn speed_test(&self) -> TestRun {
        lock(&self.speed_test).run().clone()
    }

    /// Query broker status; a failed request reports as stopped.
    pub fn refresh_mqtt(&self) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let status = match backend.mqtt_status().await {
                Ok(status) => Some(status),
                Err(e) => {
                    log::warn!("error fetching MQTT status: {e}");
                    None
                }
            };
            let _ = events.send(DashboardEvent::MqttStatus(status));
        });
    }

    pub fn start_mqtt(&self) {
        self.mqtt_command(MqttCommand::Start);
    }

    pub fn stop_mqtt(&self) {
        self.mqtt_command(MqttCommand::Stop);
    }

    fn mqtt_command(&self, command: MqttCommand) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let result = match command {
                MqttCommand::Start => backend.start_mqtt().await,
                MqttCommand::Stop => backend.stop_mqtt().await,
            };
            let outcome = match result {
                Ok(ack) => {
                    if !ack.success {
                        log::warn!("MQTT broker {command:?} was not acknowledged");
                    }
                    Ok(ack)
                }
                Err(e) => {
                    log::warn!("MQTT {command:?} failed: {e}");
                    Err(e.to_string())
                }
            };
            let _ = events.send(DashboardEvent::MqttCommand { command, outcome });
        });
    }

    /// Validate a maintenance request and, if it passes, submit it in the
    /// background. Validation failures are returned without emitting events.
    pub fn run_maintenance(&self, action: MaintenanceAction) -> Result<(), ValidationError> {
        action.validate()?;
        let kind = action.kind();
        self.emit(DashboardEvent::MaintenanceStarted(kind));

        let backend = self.maintenance.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let outcome = match backend.perform(action).await {
                Ok(msg) => Ok(msg),
                Err(e) => {
                    log::warn!("{} failed: {e}", kind.title());
                    Err(e.to_string())
                }
            };
            let _ = events.send(DashboardEvent::MaintenanceFinished { kind, outcome });
        });
        Ok(())
    }

    /// Fetch system, firmware and network information once.
    pub fn refresh_device_info(&self) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let results = [
                backend.system_info().await.map(DashboardEvent::SystemInfo),
                backend.firmware_info().await.map(DashboardEvent::FirmwareInfo),
                backend.network_info().await.map(DashboardEvent::NetworkInfo),
            ];
            for result in results {
                let event = result.unwrap_or_else(|e| {
                    log::warn!("device info request failed: {e}");
                    DashboardEvent::DeviceInfoFailed(e.to_string())
                });
                let _ = events.send(event);
            }
        });
    }

    /// Send a console command to the device. Blank input is ignored and
    /// returns `None`; otherwise the command as sent is returned.
    pub fn run_command(&self, input: &str) -> Option<String> {
        let command = normalize_command(input)?;
        self.emit(DashboardEvent::CommandSent(command.clone()));

        let backend = self.backend.clone();
        let events = self.events.clone();
        let sent = command.clone();
        self.runtime.spawn(async move {
            let result = backend.run_command(&sent).await;
            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    log::warn!("console command failed: {e}");
                    CommandOutput::failed(sent, &e.to_string())
                }
            };
            let _ = events.send(DashboardEvent::CommandFinished(output));
        });
        Some(command)
    }

    /// Stop every timer this controller started.
    pub fn dispose(&mut self) {
        self.leave_dashboard();
        self.cancel_speed_test();
    }

    fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).is_err() {
            log::debug!("dashboard event dropped, receiver closed");
        }
    }
}

impl<B, M> Drop for DashboardController<B, M> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

fn lock(test: &Mutex<BandwidthTest>) -> MutexGuard<'_, BandwidthTest> {
    test.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tick `run` until it resolves or is replaced. Events are sent while the
/// lock is held so they stay ordered against a concurrent cancel.
async fn drive_speed_test(
    test: Arc<Mutex<BandwidthTest>>,
    run: RunId,
    period: Duration,
    events: UnboundedSender<DashboardEvent>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut state = lock(&test);
        if state.run_id() != run || !state.is_active() {
            break;
        }
        for event in state.tick() {
            let _ = events.send(DashboardEvent::SpeedTest { run, event });
        }
        if !state.is_active() {
            log::debug!("speed test run {run} complete");
            break;
        }
    }
}
