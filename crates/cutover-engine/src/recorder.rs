//! Bounded sample recording
//!
//! Append-only buffer of performance samples, capped in memory with
//! oldest-first eviction and time-based pruning. Persistence and the
//! post-record monitor trigger live in the service facade.

use chrono::{DateTime, Utc};
use cutover_core::{PerformanceSample, MEMORY_SAMPLE_CAP};
use rand::{Rng, RngCore};
use std::collections::VecDeque;

/// Bounded in-memory buffer of performance samples
#[derive(Debug)]
pub struct MetricRecorder {
    buffer: VecDeque<PerformanceSample>,
    capacity: usize,
}

impl MetricRecorder {
    /// Create an empty recorder with the default capacity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_SAMPLE_CAP)
    }

    /// Create an empty recorder with an explicit capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(MEMORY_SAMPLE_CAP)),
            capacity,
        }
    }

    /// Rehydrate a recorder from previously persisted samples
    ///
    /// Samples beyond the capacity are evicted oldest-first, same as live
    /// recording.
    #[must_use]
    pub fn with_samples(samples: Vec<PerformanceSample>, capacity: usize) -> Self {
        let mut recorder = Self::with_capacity(capacity);
        for sample in samples {
            recorder.push(sample);
        }
        recorder
    }

    /// Sampling filter: uniform draw, record only at or below the rate
    ///
    /// Rate 1.0 records everything, rate 0.0 effectively nothing. The draw
    /// happens on every call regardless of the rate.
    #[must_use]
    pub fn admits(rate: f64, rng: &mut dyn RngCore) -> bool {
        rng.random::<f64>() <= rate
    }

    /// Append a sample, evicting the oldest entries above capacity
    pub fn push(&mut self, sample: PerformanceSample) {
        self.buffer.push_back(sample);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// The `n` most recent samples, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<PerformanceSample> {
        let skip = self.buffer.len().saturating_sub(n);
        self.buffer.iter().skip(skip).cloned().collect()
    }

    /// Iterate all buffered samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.buffer.iter()
    }

    /// Drop samples captured before `cutoff`, returning how many went
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.buffer.len();
        self.buffer.retain(|sample| sample.at >= cutoff);
        before - self.buffer.len()
    }

    /// Drop every sample
    #[inline]
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered samples
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of buffered samples
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MetricRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutover_core::{Backend, Feature};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample(i: usize, at: DateTime<Utc>) -> PerformanceSample {
        PerformanceSample::ok(
            Backend::Native,
            Feature::Documents,
            format!("op-{i}"),
            10.0,
            at,
        )
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let now = Utc::now();
        let mut recorder = MetricRecorder::new();
        for i in 0..1001 {
            recorder.push(sample(i, now));
        }
        assert_eq!(recorder.len(), 1000);
        // The survivor set is the 1000 most recent by insertion order.
        assert_eq!(recorder.iter().next().unwrap().operation, "op-1");
        assert_eq!(recorder.iter().last().unwrap().operation, "op-1000");
    }

    #[test]
    fn recent_returns_the_tail_in_order() {
        let now = Utc::now();
        let mut recorder = MetricRecorder::new();
        for i in 0..150 {
            recorder.push(sample(i, now));
        }
        let recent = recorder.recent(100);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent.first().unwrap().operation, "op-50");
        assert_eq!(recent.last().unwrap().operation, "op-149");
    }

    #[test]
    fn recent_handles_short_buffers() {
        let now = Utc::now();
        let mut recorder = MetricRecorder::new();
        recorder.push(sample(0, now));
        assert_eq!(recorder.recent(100).len(), 1);
    }

    #[test]
    fn prune_drops_only_expired_samples() {
        let now = Utc::now();
        let old = now - chrono::Duration::hours(25);
        let mut recorder = MetricRecorder::new();
        recorder.push(sample(0, old));
        recorder.push(sample(1, now));

        let removed = recorder.prune_before(now - chrono::Duration::hours(24));
        assert_eq!(removed, 1);
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.iter().next().unwrap().operation, "op-1");
    }

    #[test]
    fn full_rate_admits_everything() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(MetricRecorder::admits(1.0, &mut rng));
        }
    }

    #[test]
    fn zero_rate_admits_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let admitted = (0..1000)
            .filter(|_| MetricRecorder::admits(0.0, &mut rng))
            .count();
        assert_eq!(admitted, 0);
    }

    #[test]
    fn rehydration_respects_capacity() {
        let now = Utc::now();
        let samples: Vec<_> = (0..1100).map(|i| sample(i, now)).collect();
        let recorder = MetricRecorder::with_samples(samples, MEMORY_SAMPLE_CAP);
        assert_eq!(recorder.len(), 1000);
        assert_eq!(recorder.iter().next().unwrap().operation, "op-100");
    }
}
