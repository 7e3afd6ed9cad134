//! Aggregated comparison statistics
//!
//! Data carried between the comparison engine, the rollback monitor and
//! reporting surfaces. Computation lives in `cutover-engine`; these types
//! only hold results.

use serde::{Deserialize, Serialize};

/// Per-backend aggregate over one trailing window
///
/// An empty partition is all zeros, including `success_rate`: a backend
/// with no traffic has verified nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Number of samples in the partition
    pub total_requests: u64,
    /// Arithmetic mean latency, 0 if the partition is empty
    pub mean_latency_ms: f64,
    /// Failures divided by count, 0 if the partition is empty
    pub error_rate: f64,
    /// `1 - error_rate`, 0 if the partition is empty
    pub success_rate: f64,
}

impl Stats {
    /// Whether the partition saw no traffic
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }
}

/// Whether the legacy baseline contained any traffic
///
/// Distinguishes "verified no improvement" from "nothing to compare
/// against"; the numeric improvement fields stay 0 in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineCoverage {
    /// The legacy partition contained at least one sample
    Present,
    /// The legacy partition was empty; improvement figures are meaningless
    Missing,
}

/// Relative improvement of the native system over the legacy baseline
///
/// Each percentage is computed only when its legacy baseline figure is
/// non-zero, and reported as 0 otherwise; check [`Improvement::baseline`]
/// before reading the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    /// Latency reduction, percent of the legacy mean
    pub latency_pct: f64,
    /// Error-rate reduction, percent of the legacy error rate
    pub error_rate_pct: f64,
    /// Success-rate gain, percent of the legacy success rate
    pub success_rate_pct: f64,
    /// Whether the legacy baseline had any traffic at all
    pub baseline: BaselineCoverage,
}

impl Default for Improvement {
    fn default() -> Self {
        Self {
            latency_pct: 0.0,
            error_rate_pct: 0.0,
            success_rate_pct: 0.0,
            baseline: BaselineCoverage::Missing,
        }
    }
}

/// Side-by-side aggregate of both backends plus derived improvement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Comparison {
    /// Legacy-system aggregate
    pub legacy: Stats,
    /// Native-system aggregate
    pub native: Stats,
    /// Native improvement relative to the legacy baseline
    pub improvement: Improvement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_improvement_marks_baseline_missing() {
        let improvement = Improvement::default();
        assert_eq!(improvement.baseline, BaselineCoverage::Missing);
        assert_eq!(improvement.latency_pct, 0.0);
    }

    #[test]
    fn empty_stats_report_no_traffic() {
        assert!(Stats::default().is_empty());
    }
}
