//! Testing utilities for the cutover workspace
//!
//! Shared fixtures: a manually driven clock, a call-counting identity
//! hasher, deterministic RNGs and sample builders.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use cutover_core::{Backend, Clock, Feature, IdentityHasher, PerformanceSample, PolynomialHasher};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Clock that only moves when a test advances it
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    /// A fixed, readable reference instant
    pub fn epoch() -> Arc<Self> {
        Self::starting_at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Identity hasher that counts how often the hash is computed
///
/// Wraps the production polynomial hash so bucket values stay identical;
/// the counter verifies that cached assignments skip recomputation.
#[derive(Debug, Default)]
pub struct CountingHasher {
    inner: PolynomialHasher,
    calls: Arc<AtomicUsize>,
}

impl CountingHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle onto the call counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl IdentityHasher for CountingHasher {
    fn bucket(&self, id: &str) -> u8 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bucket(id)
    }
}

/// Deterministic RNG for reproducible split draws
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Successful sample against the given backend
pub fn ok_sample(backend: Backend, feature: Feature, latency_ms: f64, at: DateTime<Utc>) -> PerformanceSample {
    PerformanceSample::ok(backend, feature, "test-op", latency_ms, at)
}

/// Failed sample against the given backend
pub fn failed_sample(
    backend: Backend,
    feature: Feature,
    latency_ms: f64,
    at: DateTime<Utc>,
) -> PerformanceSample {
    PerformanceSample::failed(backend, feature, "test-op", latency_ms, "test failure", at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::epoch();
        let before = Clock::now(&*clock);
        clock.advance(Duration::minutes(5));
        assert_eq!(Clock::now(&*clock) - before, Duration::minutes(5));
    }

    #[test]
    fn counting_hasher_matches_production_buckets() {
        let counting = CountingHasher::new();
        let production = PolynomialHasher::new();
        assert_eq!(counting.bucket("user-42"), production.bucket("user-42"));
        assert_eq!(counting.counter().load(Ordering::SeqCst), 1);
    }
}
