//! Rollback monitoring
//!
//! Evaluates aggregated native-system statistics against configured
//! thresholds after every recorded sample and decides whether every
//! feature must revert to the legacy system.
//!
//! Two states: `Normal` and `RolledBack`. The transition is one-way within
//! a session; only an operator editing the configuration leaves the
//! rolled-back state. Evaluation has no cooldown or minimum-sample guard,
//! so a single slow or failing sample can tip the trailing window over a
//! threshold. That gap is carried over from the system this replaces
//! rather than silently redesigned.

use crate::compare::compare;
use chrono::{DateTime, Duration, Utc};
use cutover_core::{PerformanceSample, Stats, Thresholds};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Features follow their configured or A/B-tested assignment
    Normal,
    /// Every feature has been forced to the legacy system
    RolledBack,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Normal => f.write_str("normal"),
            MonitorState::RolledBack => f.write_str("rolled_back"),
        }
    }
}

/// What pushed the monitor over a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RollbackTrigger {
    /// Native error rate breached the configured threshold
    ErrorRate {
        /// Observed error rate over the monitoring window
        observed: f64,
        /// Configured threshold
        threshold: f64,
    },
    /// Native mean latency breached the configured threshold
    MeanLatency {
        /// Observed mean latency over the monitoring window
        observed_ms: f64,
        /// Configured threshold
        threshold_ms: f64,
    },
    /// Operator-initiated rollback
    Manual {
        /// Operator-supplied reason
        reason: String,
    },
}

impl fmt::Display for RollbackTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackTrigger::ErrorRate { observed, threshold } => write!(
                f,
                "native error rate {:.2}% exceeded threshold {:.2}%",
                observed * 100.0,
                threshold * 100.0
            ),
            RollbackTrigger::MeanLatency {
                observed_ms,
                threshold_ms,
            } => write!(
                f,
                "native mean latency {observed_ms:.0}ms exceeded threshold {threshold_ms:.0}ms"
            ),
            RollbackTrigger::Manual { reason } => write!(f, "manual rollback: {reason}"),
        }
    }
}

/// A rollback decision, as delivered to the notification sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackEvent {
    /// What tripped the rollback
    pub trigger: RollbackTrigger,
    /// Native-system aggregate over the monitoring window at decision time
    pub native: Stats,
    /// When the decision was made
    pub at: DateTime<Utc>,
}

/// Receiver for rollback notifications
///
/// The system this replaces stubbed an external monitoring endpoint here;
/// hosts wire their own implementation. Sink failures must never block
/// the rollback itself, so `notify` is infallible by contract.
pub trait RollbackSink: Send + Sync {
    /// Called once per rollback decision, after the config mutation
    fn notify(&self, event: &RollbackEvent);
}

impl<T: RollbackSink + ?Sized> RollbackSink for std::sync::Arc<T> {
    fn notify(&self, event: &RollbackEvent) {
        (**self).notify(event);
    }
}

/// Default sink: a structured warning in the log stream
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RollbackSink for TracingSink {
    fn notify(&self, event: &RollbackEvent) {
        tracing::warn!(
            trigger = %event.trigger,
            native_requests = event.native.total_requests,
            "all features rolled back to the legacy system"
        );
    }
}

/// Threshold evaluator with a one-way rolled-back latch
#[derive(Debug)]
pub struct RollbackMonitor {
    state: MonitorState,
}

impl RollbackMonitor {
    /// Create a monitor in the normal state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: MonitorState::Normal,
        }
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Evaluate thresholds over the monitoring window, all features combined
    ///
    /// Returns the rollback decision when a threshold is breached; `None`
    /// while healthy or once already rolled back (the latch is one-way).
    /// The caller applies the config mutation and notification.
    pub fn assess<'a, I>(
        &self,
        thresholds: &Thresholds,
        samples: I,
        now: DateTime<Utc>,
    ) -> Option<RollbackEvent>
    where
        I: IntoIterator<Item = &'a PerformanceSample>,
    {
        if self.state == MonitorState::RolledBack {
            return None;
        }

        let window = Duration::minutes(i64::from(thresholds.monitor_window_minutes));
        let report = compare(samples, None, window, now);
        let native = report.native;

        let trigger = if native.error_rate > thresholds.error_rate {
            RollbackTrigger::ErrorRate {
                observed: native.error_rate,
                threshold: thresholds.error_rate,
            }
        } else if native.mean_latency_ms > thresholds.mean_latency_ms {
            RollbackTrigger::MeanLatency {
                observed_ms: native.mean_latency_ms,
                threshold_ms: thresholds.mean_latency_ms,
            }
        } else {
            return None;
        };

        Some(RollbackEvent {
            trigger,
            native,
            at: now,
        })
    }

    /// Latch into the rolled-back state
    #[inline]
    pub fn mark_rolled_back(&mut self) {
        self.state = MonitorState::RolledBack;
    }

    /// Operator path out of the rolled-back state (explicit config edit)
    #[inline]
    pub fn acknowledge(&mut self) {
        self.state = MonitorState::Normal;
    }
}

impl Default for RollbackMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cutover_core::{Backend, Feature};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn native_ok(latency: f64) -> PerformanceSample {
        PerformanceSample::ok(Backend::Native, Feature::Documents, "op", latency, at())
    }

    fn native_failed() -> PerformanceSample {
        PerformanceSample::failed(Backend::Native, Feature::Documents, "op", 10.0, "boom", at())
    }

    #[test]
    fn healthy_window_triggers_nothing() {
        let monitor = RollbackMonitor::new();
        let samples = vec![native_ok(100.0), native_ok(200.0)];
        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_none());
    }

    #[test]
    fn error_rate_breach_triggers_rollback() {
        let monitor = RollbackMonitor::new();
        // 6 failures out of 100 -> 6% > 5% default threshold.
        let mut samples: Vec<_> = (0..94).map(|_| native_ok(10.0)).collect();
        samples.extend((0..6).map(|_| native_failed()));

        let event = monitor
            .assess(&Thresholds::default(), &samples, at())
            .expect("rollback");
        assert!(matches!(event.trigger, RollbackTrigger::ErrorRate { .. }));
        assert_eq!(event.native.total_requests, 100);
    }

    #[test]
    fn latency_breach_triggers_rollback() {
        let monitor = RollbackMonitor::new();
        let samples = vec![native_ok(5000.0), native_ok(4000.0)];

        let event = monitor
            .assess(&Thresholds::default(), &samples, at())
            .expect("rollback");
        assert!(matches!(event.trigger, RollbackTrigger::MeanLatency { .. }));
    }

    #[test]
    fn empty_native_partition_never_triggers() {
        let monitor = RollbackMonitor::new();
        let samples = vec![PerformanceSample::failed(
            Backend::Legacy,
            Feature::Documents,
            "op",
            9000.0,
            "legacy being legacy",
            at(),
        )];
        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_none());
    }

    #[test]
    fn samples_outside_the_monitor_window_are_ignored() {
        let monitor = RollbackMonitor::new();
        let mut old = native_ok(9000.0);
        old.at = at() - Duration::minutes(30);
        let samples = vec![old, native_ok(100.0)];

        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_none());
    }

    #[test]
    fn latched_monitor_stops_assessing() {
        let mut monitor = RollbackMonitor::new();
        let samples = vec![native_ok(5000.0)];
        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_some());

        monitor.mark_rolled_back();
        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_none());

        monitor.acknowledge();
        assert!(monitor
            .assess(&Thresholds::default(), &samples, at())
            .is_some());
    }
}
