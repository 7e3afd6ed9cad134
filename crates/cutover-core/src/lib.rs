//! Core domain types for the cutover migration engine
//!
//! Defines the vocabulary shared by every other crate in the workspace:
//! - Features and their routing modes
//! - The two backing systems and resolved routes
//! - Performance samples and aggregated statistics
//! - Configuration (routing table, A/B policy, thresholds)
//! - Seams for wall-clock time and identity hashing

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod config;
pub mod error;
pub mod hash;
pub mod stats;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::{
    AbTestPolicy, CutoverConfig, RoutingTable, Thresholds, DEFAULT_COMPARE_WINDOW_MINUTES,
    MEMORY_SAMPLE_CAP, PERSISTED_SAMPLE_CAP, PRUNE_INTERVAL_SECS, RETENTION_HOURS,
};
pub use error::ConfigError;
pub use hash::{IdentityHasher, PolynomialHasher};
pub use stats::{BaselineCoverage, Comparison, Improvement, Stats};
pub use types::{Backend, Feature, FeatureMode, PerformanceSample, Route};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
