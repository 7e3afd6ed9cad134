//! Comparison engine
//!
//! Pure aggregation of buffered samples into per-backend statistics over a
//! trailing window, plus relative improvement of native over the legacy
//! baseline. No side effects; safe to call at any frequency.

use chrono::{DateTime, Duration, Utc};
use cutover_core::{Backend, BaselineCoverage, Comparison, Feature, Improvement, PerformanceSample, Stats};

#[derive(Debug, Default)]
struct Partition {
    count: u64,
    failures: u64,
    latency_sum: f64,
}

impl Partition {
    fn add(&mut self, sample: &PerformanceSample) {
        self.count += 1;
        if !sample.success {
            self.failures += 1;
        }
        self.latency_sum += sample.latency_ms;
    }

    #[allow(clippy::cast_precision_loss)]
    fn stats(&self) -> Stats {
        if self.count == 0 {
            return Stats::default();
        }
        let error_rate = self.failures as f64 / self.count as f64;
        Stats {
            total_requests: self.count,
            mean_latency_ms: self.latency_sum / self.count as f64,
            error_rate,
            success_rate: 1.0 - error_rate,
        }
    }
}

/// Aggregate samples within `window` of `now` into a side-by-side report
///
/// Filters to the given feature when one is supplied. Improvement
/// percentages are derived only where the legacy baseline figure is
/// non-zero and reported as 0 otherwise; `improvement.baseline` records
/// whether the legacy partition held any traffic at all.
pub fn compare<'a, I>(
    samples: I,
    feature: Option<Feature>,
    window: Duration,
    now: DateTime<Utc>,
) -> Comparison
where
    I: IntoIterator<Item = &'a PerformanceSample>,
{
    let cutoff = now - window;
    let mut legacy = Partition::default();
    let mut native = Partition::default();

    for sample in samples {
        if sample.at < cutoff {
            continue;
        }
        if let Some(feature) = feature {
            if sample.feature != feature {
                continue;
            }
        }
        match sample.backend {
            Backend::Legacy => legacy.add(sample),
            Backend::Native => native.add(sample),
        }
    }

    let legacy = legacy.stats();
    let native = native.stats();
    let improvement = improvement(&legacy, &native);

    Comparison {
        legacy,
        native,
        improvement,
    }
}

fn improvement(legacy: &Stats, native: &Stats) -> Improvement {
    let baseline = if legacy.is_empty() {
        BaselineCoverage::Missing
    } else {
        BaselineCoverage::Present
    };

    let latency_pct = if legacy.mean_latency_ms > 0.0 {
        (legacy.mean_latency_ms - native.mean_latency_ms) / legacy.mean_latency_ms * 100.0
    } else {
        0.0
    };
    let error_rate_pct = if legacy.error_rate > 0.0 {
        (legacy.error_rate - native.error_rate) / legacy.error_rate * 100.0
    } else {
        0.0
    };
    let success_rate_pct = if legacy.success_rate > 0.0 {
        (native.success_rate - legacy.success_rate) / legacy.success_rate * 100.0
    } else {
        0.0
    };

    Improvement {
        latency_pct,
        error_rate_pct,
        success_rate_pct,
        baseline,
    }
}
