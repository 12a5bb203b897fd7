//! Periodic metrics poller.
//!
//! One tokio task per active poller: fetch immediately, then every
//! `interval`. Each result goes out on the dashboard event channel. Failures
//! are logged and reported, never retried; the next tick is unaffected.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::dashboard::DashboardEvent;
use crate::error::Result;
use crate::metrics::MetricsSnapshot;

/// Source of metrics snapshots.
pub trait MetricsBackend: Send + Sync + 'static {
    fn fetch_metrics(&self) -> impl Future<Output = Result<MetricsSnapshot>> + Send;
}

/// Owns the polling task; dropping the poller stops it.
pub struct MetricsPoller<B> {
    backend: Arc<B>,
    interval: Duration,
    events: UnboundedSender<DashboardEvent>,
    runtime: Handle,
    task: Option<JoinHandle<()>>,
}

impl<B: MetricsBackend> MetricsPoller<B> {
    pub fn new(
        backend: Arc<B>,
        interval: Duration,
        events: UnboundedSender<DashboardEvent>,
        runtime: Handle,
    ) -> Self {
        Self {
            backend,
            interval,
            events,
            runtime,
            task: None,
        }
    }

    /// Start polling. An already running task is cancelled first, so there
    /// is never more than one.
    pub fn start(&mut self) {
        self.stop();
        log::debug!("metrics poller starting, every {:?}", self.interval);
        let task = poll_loop(self.backend.clone(), self.interval, self.events.clone());
        self.task = Some(self.runtime.spawn(task));
    }

    /// Cancel the polling task. A fetch still in flight is dropped with it.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("metrics poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<B> Drop for MetricsPoller<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_loop<B: MetricsBackend>(
    backend: Arc<B>,
    period: Duration,
    events: UnboundedSender<DashboardEvent>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let event = match backend.fetch_metrics().await {
            Ok(snapshot) => DashboardEvent::Metrics(snapshot),
            Err(e) => {
                log::warn!("metrics poll failed: {e}");
                DashboardEvent::PollFailed(e.to_string())
            }
        };
        if events.send(event).is_err() {
            log::debug!("event receiver gone, poller exiting");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::metrics::{
        BandwidthMetrics, CpuMetrics, LinkStatus, MemoryMetrics, StorageMetrics,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    /// Fails every third call.
    #[derive(Default)]
    struct Flaky {
        calls: AtomicUsize,
    }

    impl MetricsBackend for Flaky {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 3 == 2 {
                return Err(Error::Backend("device busy".into()));
            }
            Ok(MetricsSnapshot {
                cpu: CpuMetrics { usage: n as f64 },
                memory: MemoryMetrics {
                    usage: 0.0,
                    used: 0,
                    total: 0,
                },
                storage: StorageMetrics::from_megabytes(0, 0),
                bandwidth: BandwidthMetrics {
                    download: 0.0,
                    upload: 0.0,
                },
                internet: LinkStatus { connected: true },
                ultima_server: LinkStatus { connected: true },
            })
        }
    }

    fn drain(rx: &mut UnboundedReceiver<DashboardEvent>) -> Vec<DashboardEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn poller(
        backend: Arc<Flaky>,
    ) -> (MetricsPoller<Flaky>, UnboundedReceiver<DashboardEvent>) {
        let (tx, rx) = unbounded_channel();
        let p = MetricsPoller::new(backend, Duration::from_millis(2000), tx, Handle::current());
        (p, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_every_interval() {
        let backend = Arc::new(Flaky::default());
        let (mut p, mut rx) = poller(backend.clone());
        p.start();
        tokio::time::sleep(Duration::from_millis(4500)).await;
        let events = drain(&mut rx);
        assert_eq!(events.len(), 3, "t=0, 2000, 4000");
        assert!(matches!(events[0], DashboardEvent::Metrics(_)));
        assert!(matches!(events[2], DashboardEvent::PollFailed(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_stop_polling() {
        let backend = Arc::new(Flaky::default());
        let (mut p, mut rx) = poller(backend);
        p.start();
        tokio::time::sleep(Duration::from_millis(6500)).await;
        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(events[3], DashboardEvent::Metrics(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_duplicate_task() {
        let backend = Arc::new(Flaky::default());
        let (mut p, mut rx) = poller(backend.clone());
        p.start();
        p.start();
        p.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences() {
        let backend = Arc::new(Flaky::default());
        let (mut p, mut rx) = poller(backend);
        p.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        p.stop();
        p.stop();
        assert!(!p.is_running());
        drain(&mut rx);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_polling() {
        let backend = Arc::new(Flaky::default());
        let (mut p, _rx) = poller(backend.clone());
        p.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(p);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
