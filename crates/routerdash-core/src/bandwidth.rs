//! Simulated two-phase bandwidth test.
//!
//! The test is a pure state machine driven by [`BandwidthTest::tick`]; the
//! controller owns the timer that calls it every [`TICK_INTERVAL`]. Each tick
//! advances progress by [`PROGRESS_STEP`]. Progress 0..50 is the download
//! phase and 50..100 the upload phase; in each phase the displayed speed is
//! a linear ramp toward a target picked from a [`SpeedSource`] when the phase
//! begins.
//!
//! ```text
//! Idle ──start──▶ Downloading ──p≥50──▶ Uploading ──p≥100──▶ Done ──start──▶ Downloading
//!   ▲                  │                     │
//!   └────cancel────────┴─────────────────────┘
//! ```

use std::ops::Range;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::history::BandwidthSample;

/// Delay between progress ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Progress added per tick, in percent of the whole test.
pub const PROGRESS_STEP: u8 = 2;

/// Progress at which the download phase ends and upload begins.
pub const DOWNLOAD_END: u8 = 50;

/// Progress at which the test resolves.
pub const TEST_END: u8 = 100;

/// Download targets are drawn uniformly from this range (Mbps).
pub const DOWNLOAD_RANGE: Range<f64> = 700.0..1000.0;

/// Upload targets are drawn uniformly from this range (Mbps).
pub const UPLOAD_RANGE: Range<f64> = 70.0..120.0;

/// Ping readout shown once the test has been running for half a second.
pub const SIMULATED_PING_MS: u32 = 3;

const PING_AFTER_TICKS: u32 = 5;

/// Scale applied to final speeds before they enter the history chart.
pub const HISTORY_SCALE: f64 = 10.0;

/// Identifier of one started run; bumps on every accepted `start()`.
pub type RunId = u64;

/// Picks the speed each phase ramps toward.
pub trait SpeedSource: Send {
    fn download_target(&mut self) -> f64;
    fn upload_target(&mut self) -> f64;
}

/// Uniformly random targets within [`DOWNLOAD_RANGE`] and [`UPLOAD_RANGE`].
pub struct RandomSpeeds<R = StdRng> {
    rng: R,
}

impl RandomSpeeds<StdRng> {
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible targets for demos and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> SpeedSource for RandomSpeeds<R> {
    fn download_target(&mut self) -> f64 {
        self.rng.random_range(DOWNLOAD_RANGE)
    }

    fn upload_target(&mut self) -> f64 {
        self.rng.random_range(UPLOAD_RANGE)
    }
}

/// Always the same targets.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpeeds {
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

impl SpeedSource for FixedSpeeds {
    fn download_target(&mut self) -> f64 {
        self.download_mbps
    }

    fn upload_target(&mut self) -> f64 {
        self.upload_mbps
    }
}

/// Stage of a bandwidth test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Downloading,
    Uploading,
    Done,
}

impl Phase {
    /// True while a ticker should be running.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Downloading | Self::Uploading)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Downloading => "Testing download",
            Self::Uploading => "Testing upload",
            Self::Done => "Complete",
        }
    }
}

/// Displayed speed for `progress` within `phase`, ramping toward `target`.
///
/// Download: `progress / 50 * target`. Upload: `(progress - 50) / 50 * target`.
/// Idle and Done read zero.
pub fn interpolate(phase: Phase, progress: u8, target: f64) -> f64 {
    let span = f64::from(DOWNLOAD_END);
    match phase {
        Phase::Downloading => f64::from(progress.min(DOWNLOAD_END)) / span * target,
        Phase::Uploading => {
            f64::from(progress.clamp(DOWNLOAD_END, TEST_END) - DOWNLOAD_END) / span * target
        }
        Phase::Idle | Phase::Done => 0.0,
    }
}

/// State of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestRun {
    pub phase: Phase,
    /// Percent of the whole test, 0..=100.
    pub progress: u8,
    pub target_download_mbps: f64,
    pub target_upload_mbps: f64,
    /// Speed readout driven by the ramp.
    pub current_mbps: f64,
    /// Frozen download result once the download phase ends.
    pub download_mbps: Option<f64>,
    /// Frozen upload result once the test resolves.
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<u32>,
    ticks: u32,
}

/// What changed on a transition; the view model renders these.
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    /// Readouts reset and the download phase began.
    Started,
    Progress {
        phase: Phase,
        progress: u8,
        current_mbps: f64,
    },
    Ping {
        ms: u32,
    },
    DownloadComplete {
        mbps: f64,
    },
    UploadComplete {
        mbps: f64,
    },
    /// The test resolved; `sample` goes into the history chart.
    Completed {
        sample: BandwidthSample,
    },
    /// The run was abandoned; nothing is recorded.
    Cancelled,
}

/// Single-run bandwidth test state machine.
pub struct BandwidthTest {
    run: TestRun,
    source: Box<dyn SpeedSource>,
    run_id: RunId,
}

impl BandwidthTest {
    pub fn new(source: impl SpeedSource + 'static) -> Self {
        Self {
            run: TestRun::default(),
            source: Box::new(source),
            run_id: 0,
        }
    }

    /// Random targets seeded from the OS.
    pub fn run(&self) -> &TestRun {
        &self.run
    }

    pub fn phase(&self) -> Phase {
        self.run.phase
    }

    pub fn is_active(&self) -> bool {
        self.run.phase.is_active()
    }

    /// Id of the most recently started run (0 before the first start).
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Begin a new run. Returns `None` without touching any state if a run
    /// is already in progress.
    pub fn start(&mut self) -> Option<Vec<TestEvent>> {
        if self.is_active() {
            return None;
        }
        self.run_id += 1;
        self.run = TestRun {
            phase: Phase::Downloading,
            target_download_mbps: self.source.download_target(),
            ..TestRun::default()
        };
        Some(vec![
            TestEvent::Started,
            TestEvent::Progress {
                phase: Phase::Downloading,
                progress: 0,
                current_mbps: 0.0,
            },
        ])
    }

    /// Advance one tick. Does nothing unless a phase is active.
    pub fn tick(&mut self) -> Vec<TestEvent> {
        let phase = self.run.phase;
        if !phase.is_active() {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(3);
        self.run.ticks += 1;
        if self.run.ticks == PING_AFTER_TICKS && self.run.ping_ms.is_none() {
            self.run.ping_ms = Some(SIMULATED_PING_MS);
            events.push(TestEvent::Ping {
                ms: SIMULATED_PING_MS,
            });
        }
        self.run.progress = self.run.progress.saturating_add(PROGRESS_STEP).min(TEST_END);
        let progress = self.run.progress;

        match phase {
            Phase::Downloading if progress >= DOWNLOAD_END => {
                let mbps = self.run.target_download_mbps;
                self.run.current_mbps = mbps;
                self.run.download_mbps = Some(mbps);
                events.push(TestEvent::Progress {
                    phase,
                    progress,
                    current_mbps: mbps,
                });
                events.push(TestEvent::DownloadComplete { mbps });

                self.run.target_upload_mbps = self.source.upload_target();
                self.run.phase = Phase::Uploading;
            }
            Phase::Uploading if progress >= TEST_END => {
                let mbps = self.run.target_upload_mbps;
                self.run.current_mbps = mbps;
                self.run.upload_mbps = Some(mbps);
                self.run.phase = Phase::Done;
                events.push(TestEvent::Progress {
                    phase,
                    progress,
                    current_mbps: mbps,
                });
                events.push(TestEvent::UploadComplete { mbps });
                events.push(TestEvent::Completed {
                    sample: BandwidthSample {
                        download_mbps: self.run.target_download_mbps / HISTORY_SCALE,
                        upload_mbps: mbps / HISTORY_SCALE,
                    },
                });
            }
            _ => {
                let target = match phase {
                    Phase::Downloading => self.run.target_download_mbps,
                    _ => self.run.target_upload_mbps,
                };
                self.run.current_mbps = interpolate(phase, progress, target);
                events.push(TestEvent::Progress {
                    phase,
                    progress,
                    current_mbps: self.run.current_mbps,
                });
            }
        }
        events
    }

    /// Abandon an active run and return to Idle. Returns whether a run was
    /// actually cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.run = TestRun::default();
        true
    }

    /// Clear the readouts of a finished run. Returns `false`, changing
    /// nothing, while a run is active.
    pub fn reset(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.run = TestRun::default();
        true
    }
}

impl std::fmt::Debug for BandwidthTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthTest")
            .field("run", &self.run)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}
