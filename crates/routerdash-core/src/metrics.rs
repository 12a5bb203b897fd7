//! Device metrics snapshot as served by `GET /api/metrics`.
//!
//! A snapshot is produced by the device once per poll, is immutable after
//! receipt, and fully replaces whatever was displayed before. Deserialization
//! is strict: a body missing any group fails the whole poll tick.

use serde::{Deserialize, Serialize};

/// Percentage in `0.0..=100.0` (the device does not clamp; renderers do).
pub type Percent = f64;

/// Point-in-time metrics for the whole device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub storage: StorageMetrics,
    pub bandwidth: BandwidthMetrics,
    pub internet: LinkStatus,
    pub ultima_server: LinkStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub usage: Percent,
}

/// RAM usage; `used` and `total` are megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub usage: Percent,
    pub used: u64,
    pub total: u64,
}

/// Root filesystem usage.
///
/// `used`, `free` and `total` are megabytes on the wire; the formatted
/// strings are what the device wants shown (`"512 MB"`, `"3.5 GB"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub usage: Percent,
    pub used: u64,
    pub free: u64,
    #[serde(default)]
    pub total: u64,
    pub used_formatted: String,
    pub total_formatted: String,
}

/// Aggregate non-loopback throughput in KB/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthMetrics {
    pub download: f64,
    pub upload: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub connected: bool,
}

impl StorageMetrics {
    /// Build storage metrics from megabyte counts, deriving usage and labels.
    pub fn from_megabytes(used: u64, free: u64) -> Self {
        let total = used.saturating_add(free);
        let usage = if total == 0 {
            0.0
        } else {
            100.0 * used as f64 / total as f64
        };
        Self {
            usage,
            used,
            free,
            total,
            used_formatted: format_megabytes(used),
            total_formatted: format_megabytes(total),
        }
    }
}

/// Format a megabyte count the way the device labels storage.
///
/// Below 1024 MB the value is shown in whole megabytes, above it in
/// gigabytes with one decimal.
pub fn format_megabytes(mb: u64) -> String {
    if mb < 1024 {
        format!("{mb} MB")
    } else {
        format!("{:.1} GB", mb as f64 / 1024.0)
    }
}

/// Clamp a percentage to a drawable bar width.
pub fn bar_width(p: Percent) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) }
}
