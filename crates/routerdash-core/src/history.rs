//! Rolling history of completed bandwidth tests.

use std::collections::VecDeque;

use rand::Rng;

/// Number of past results kept on the history chart.
pub const HISTORY_CAPACITY: usize = 24;

/// One completed bandwidth test, in chart units (Mbps scaled by 1/10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSample {
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// FIFO of the last [`HISTORY_CAPACITY`] results. Its length never changes:
/// recording a result evicts the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    entries: VecDeque<BandwidthSample>,
}

impl HistorySeries {
    /// All-zero history.
    pub fn zeroed() -> Self {
        Self {
            entries: std::iter::repeat_n(
                BandwidthSample {
                    download_mbps: 0.0,
                    upload_mbps: 0.0,
                },
                HISTORY_CAPACITY,
            )
            .collect(),
        }
    }

    /// Synthetic hourly history: download in [500, 950), upload in [50, 120).
    pub fn seeded<R: Rng>(rng: &mut R) -> Self {
        Self {
            entries: (0..HISTORY_CAPACITY)
                .map(|_| BandwidthSample {
                    download_mbps: rng.random_range(500.0..950.0),
                    upload_mbps: rng.random_range(50.0..120.0),
                })
                .collect(),
        }
    }

    /// Append a result, evicting the oldest.
    pub fn record(&mut self, sample: BandwidthSample) {
        self.entries.pop_front();
        self.entries.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<BandwidthSample> {
        self.entries.back().copied()
    }

    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = &BandwidthSample> + ExactSizeIterator + '_ {
        self.entries.iter()
    }

    pub fn download_points(&self) -> Vec<(f64, f64)> {
        self.iter()
            .enumerate()
            .map(|(i, s)| (i as f64, s.download_mbps))
            .collect()
    }

    pub fn upload_points(&self) -> Vec<(f64, f64)> {
        self.iter()
            .enumerate()
            .map(|(i, s)| (i as f64, s.upload_mbps))
            .collect()
    }

    pub fn peak(&self) -> f64 {
        self.iter()
            .map(|s| s.download_mbps.max(s.upload_mbps))
            .fold(0.0, f64::max)
    }
}

impl Default for HistorySeries {
    fn default() -> Self {
        Self::zeroed()
    }
}
