//! Fixed-width rolling sample window for the CPU and memory charts.

use std::collections::VecDeque;

/// Number of samples shown on the CPU/memory charts.
pub const DEFAULT_WINDOW_LEN: usize = 30;

/// A window that always holds exactly `len` samples.
///
/// Starts zero-filled; every push drops the oldest sample so the chart
/// scrolls while its width stays constant.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
}

impl RollingWindow {
    /// Create a zero-filled window. A zero length is bumped to one.
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        Self {
            samples: std::iter::repeat_n(0.0, len).collect(),
        }
    }

    /// Drop the oldest sample and append `value`.
    pub fn push(&mut self, value: f64) {
        self.samples.pop_front();
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: the window is never empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// `(index, value)` points ready for a line chart.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.iter()
            .enumerate()
            .map(|(i, v)| (i as f64, v))
            .collect()
    }

    pub fn max(&self) -> f64 {
        self.iter().fold(0.0, f64::max)
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LEN)
    }
}
