//! Comparison-engine and hashing throughput
//!
//! The comparison runs synchronously after every recorded sample, so its
//! cost bounds the recording hot path.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cutover_core::{Backend, Feature, IdentityHasher, PerformanceSample, PolynomialHasher};
use cutover_engine::compare;

fn full_buffer() -> Vec<PerformanceSample> {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    (0..1000)
        .map(|i| {
            let backend = if i % 2 == 0 {
                Backend::Legacy
            } else {
                Backend::Native
            };
            PerformanceSample::ok(
                backend,
                Feature::Documents,
                "bench-op",
                f64::from(i % 500),
                at - Duration::seconds(i64::from(i % 300)),
            )
        })
        .collect()
}

fn bench_compare(c: &mut Criterion) {
    let samples = full_buffer();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    c.bench_function("compare_full_buffer", |b| {
        b.iter(|| compare(black_box(&samples), None, Duration::minutes(10), now));
    });
}

fn bench_bucket(c: &mut Criterion) {
    let hasher = PolynomialHasher::new();
    c.bench_function("polynomial_bucket", |b| {
        b.iter(|| hasher.bucket(black_box("user-42@example.com")));
    });
}

criterion_group!(benches, bench_compare, bench_bucket);
criterion_main!(benches);
