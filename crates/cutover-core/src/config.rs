//! Routing configuration, A/B policy and rollback thresholds
//!
//! Lifecycle: built from environment defaults at process start, mutated by
//! explicit admin calls or by the rollback monitor, persisted on every
//! mutation, reloaded at next start.

use crate::error::ConfigError;
use crate::types::{Feature, FeatureMode, Route};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-memory sample buffer capacity; oldest entries evicted above this
pub const MEMORY_SAMPLE_CAP: usize = 1000;

/// Number of most-recent samples written to the store on every record
pub const PERSISTED_SAMPLE_CAP: usize = 100;

/// Samples older than this are dropped by the hourly sweep
pub const RETENTION_HOURS: i64 = 24;

/// Interval of the background prune sweep
pub const PRUNE_INTERVAL_SECS: u64 = 3600;

/// Default trailing window for comparison reports
pub const DEFAULT_COMPARE_WINDOW_MINUTES: u32 = 60;

/// Total mapping from every feature to its routing mode
///
/// Always covers all five features; there is no "unset" state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    modes: BTreeMap<Feature, FeatureMode>,
}

impl RoutingTable {
    /// Table with every feature routed to the legacy system
    #[must_use]
    pub fn all_legacy() -> Self {
        Self {
            modes: Feature::ALL
                .into_iter()
                .map(|f| (f, FeatureMode::Legacy))
                .collect(),
        }
    }

    /// Current mode for a feature
    #[inline]
    #[must_use]
    pub fn mode(&self, feature: Feature) -> FeatureMode {
        // The table is total by construction.
        self.modes
            .get(&feature)
            .copied()
            .unwrap_or(FeatureMode::Legacy)
    }

    /// Set a feature's mode
    ///
    /// # Errors
    /// [`ConfigError::InvalidMode`] when `Cognito` is requested for a
    /// feature other than authentication.
    pub fn set_mode(&mut self, feature: Feature, mode: FeatureMode) -> Result<(), ConfigError> {
        if mode == FeatureMode::Cognito && feature != Feature::Authentication {
            return Err(ConfigError::InvalidMode { feature, mode });
        }
        self.modes.insert(feature, mode);
        Ok(())
    }

    /// Force every feature back to the legacy system
    pub fn force_all_legacy(&mut self) {
        for feature in Feature::ALL {
            self.modes.insert(feature, FeatureMode::Legacy);
        }
    }

    /// Iterate features and their modes in table order
    pub fn iter(&self) -> impl Iterator<Item = (Feature, FeatureMode)> + '_ {
        self.modes.iter().map(|(f, m)| (*f, *m))
    }

    /// Whether any feature is currently routed away from legacy
    #[must_use]
    pub fn any_non_legacy(&self) -> bool {
        self.modes.values().any(|m| *m != FeatureMode::Legacy)
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::all_legacy()
    }
}

/// A/B split policy, one record for the whole session
///
/// Immutable within a session except via explicit config update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestPolicy {
    /// Global kill switch; disabled means A/B features route to legacy
    pub enabled: bool,
    /// Percentage of traffic routed to the native system (0–100)
    pub split_percentage: u8,
    /// Split deterministically by user identity instead of per call
    pub split_by_user: bool,
    /// Route forced for recognized admin identities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_override: Option<Route>,
}

impl AbTestPolicy {
    /// Validate field ranges
    ///
    /// # Errors
    /// [`ConfigError::InvalidSplit`] when the split percentage exceeds 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split_percentage > 100 {
            return Err(ConfigError::InvalidSplit(self.split_percentage));
        }
        Ok(())
    }

    /// With a split percentage
    #[inline]
    #[must_use]
    pub fn with_split(mut self, percentage: u8) -> Self {
        self.split_percentage = percentage;
        self
    }

    /// With the global switch flipped
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With per-user deterministic splitting toggled
    #[inline]
    #[must_use]
    pub fn with_split_by_user(mut self, by_user: bool) -> Self {
        self.split_by_user = by_user;
        self
    }

    /// With an admin override route
    #[inline]
    #[must_use]
    pub fn with_admin_override(mut self, route: Route) -> Self {
        self.admin_override = Some(route);
        self
    }
}

impl Default for AbTestPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            split_percentage: 50,
            split_by_user: true,
            admin_override: None,
        }
    }
}

/// Rollback thresholds and recording rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Native error rate above this forces rollback (fraction, 0.0–1.0)
    pub error_rate: f64,
    /// Native mean latency above this forces rollback
    pub mean_latency_ms: f64,
    /// Trailing window evaluated by the rollback monitor
    pub monitor_window_minutes: u32,
    /// Fraction of operations recorded (1.0 = always)
    pub sample_rate: f64,
}

impl Thresholds {
    /// Validate field ranges
    ///
    /// # Errors
    /// [`ConfigError::InvalidRate`] for a sample rate outside 0.0–1.0,
    /// [`ConfigError::InvalidThreshold`] for non-positive thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(ConfigError::InvalidRate(self.sample_rate));
        }
        if self.error_rate <= 0.0 || self.error_rate > 1.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "error_rate",
                value: self.error_rate,
            });
        }
        if self.mean_latency_ms <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "mean_latency_ms",
                value: self.mean_latency_ms,
            });
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_rate: 0.05,
            mean_latency_ms: 2000.0,
            monitor_window_minutes: 10,
            sample_rate: 1.0,
        }
    }
}

/// Complete persisted configuration: routing table, A/B policy, thresholds
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CutoverConfig {
    /// Per-feature routing modes
    pub routing: RoutingTable,
    /// A/B split policy
    pub policy: AbTestPolicy,
    /// Rollback thresholds and recording rate
    pub thresholds: Thresholds,
}

impl CutoverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a routing mode for one feature
    ///
    /// # Panics
    /// Panics on `Cognito` for a non-authentication feature; use
    /// [`RoutingTable::set_mode`] for the fallible path.
    #[must_use]
    pub fn with_mode(mut self, feature: Feature, mode: FeatureMode) -> Self {
        self.routing
            .set_mode(feature, mode)
            .expect("invalid mode for feature");
        self
    }

    /// With an A/B policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: AbTestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// With thresholds
    #[inline]
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validate the whole configuration
    ///
    /// # Errors
    /// First validation failure from the policy or the thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        self.thresholds.validate()
    }

    /// Defaults overridden from the process environment
    ///
    /// Reads `CUTOVER_MODE_<FEATURE>`, `CUTOVER_AB_ENABLED`,
    /// `CUTOVER_AB_SPLIT`, `CUTOVER_AB_BY_USER`,
    /// `CUTOVER_ERROR_THRESHOLD`, `CUTOVER_LATENCY_THRESHOLD_MS` and
    /// `CUTOVER_SAMPLE_RATE`. Malformed values are logged at warn level
    /// and ignored, never fatal.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        for feature in Feature::ALL {
            let key = format!("CUTOVER_MODE_{}", feature.as_str().to_uppercase());
            if let Some(raw) = read_env(&key) {
                match raw.parse::<FeatureMode>() {
                    Ok(mode) => {
                        if let Err(err) = config.routing.set_mode(feature, mode) {
                            tracing::warn!("ignoring {key}={raw}: {err}");
                        }
                    }
                    Err(err) => tracing::warn!("ignoring {key}={raw}: {err}"),
                }
            }
        }

        if let Some(enabled) = parse_env("CUTOVER_AB_ENABLED") {
            config.policy.enabled = enabled;
        }
        if let Some(split) = parse_env::<u8>("CUTOVER_AB_SPLIT") {
            if split <= 100 {
                config.policy.split_percentage = split;
            } else {
                tracing::warn!("ignoring CUTOVER_AB_SPLIT={split}: out of range");
            }
        }
        if let Some(by_user) = parse_env("CUTOVER_AB_BY_USER") {
            config.policy.split_by_user = by_user;
        }
        if let Some(rate) = parse_env::<f64>("CUTOVER_ERROR_THRESHOLD") {
            if rate > 0.0 && rate <= 1.0 {
                config.thresholds.error_rate = rate;
            } else {
                tracing::warn!("ignoring CUTOVER_ERROR_THRESHOLD={rate}: out of range");
            }
        }
        if let Some(latency) = parse_env::<f64>("CUTOVER_LATENCY_THRESHOLD_MS") {
            if latency > 0.0 {
                config.thresholds.mean_latency_ms = latency;
            } else {
                tracing::warn!("ignoring CUTOVER_LATENCY_THRESHOLD_MS={latency}: out of range");
            }
        }
        if let Some(rate) = parse_env::<f64>("CUTOVER_SAMPLE_RATE") {
            if (0.0..=1.0).contains(&rate) {
                config.thresholds.sample_rate = rate;
            } else {
                tracing::warn!("ignoring CUTOVER_SAMPLE_RATE={rate}: out of range");
            }
        }

        config
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = read_env(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw}: malformed value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn routing_table_is_total_and_legacy_by_default() {
        let table = RoutingTable::default();
        for feature in Feature::ALL {
            assert_eq!(table.mode(feature), FeatureMode::Legacy);
        }
        assert!(!table.any_non_legacy());
    }

    #[test]
    fn cognito_is_rejected_outside_authentication() {
        let mut table = RoutingTable::default();
        assert!(table
            .set_mode(Feature::Documents, FeatureMode::Cognito)
            .is_err());
        assert!(table
            .set_mode(Feature::Authentication, FeatureMode::Cognito)
            .is_ok());
    }

    #[test]
    fn force_all_legacy_clears_every_route() {
        let mut table = RoutingTable::default();
        table.set_mode(Feature::Documents, FeatureMode::Native).unwrap();
        table.set_mode(Feature::Realtime, FeatureMode::AbTest).unwrap();
        assert!(table.any_non_legacy());

        table.force_all_legacy();
        assert!(!table.any_non_legacy());
    }

    #[test]
    fn policy_validation_rejects_oversized_split() {
        let policy = AbTestPolicy::default().with_split(101);
        assert!(policy.validate().is_err());
        assert!(AbTestPolicy::default().with_split(100).validate().is_ok());
    }

    #[test]
    fn threshold_validation_rejects_bad_rates() {
        let mut thresholds = Thresholds::default();
        thresholds.sample_rate = 1.5;
        assert!(thresholds.validate().is_err());

        let mut thresholds = Thresholds::default();
        thresholds.error_rate = 0.0;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = CutoverConfig::new()
            .with_mode(Feature::Documents, FeatureMode::AbTest)
            .with_policy(AbTestPolicy::default().with_enabled(true).with_split(25));
        let json = serde_json::to_string(&config).unwrap();
        let back: CutoverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.error_rate, 0.05);
        assert_eq!(thresholds.mean_latency_ms, 2000.0);
        assert_eq!(thresholds.monitor_window_minutes, 10);
        assert_eq!(thresholds.sample_rate, 1.0);
    }
}
