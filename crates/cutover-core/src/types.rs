//! Fundamental routing and measurement types
//!
//! - [`Feature`]: the closed set of migratable feature slices
//! - [`FeatureMode`]: how a feature is routed
//! - [`Backend`]: the two backing systems a request can actually land on
//! - [`Route`]: a resolver's answer, including the Cognito variant
//! - [`PerformanceSample`]: one tracked operation

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named slice of functionality that can be routed independently
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// Sign-in, sign-up and session handling
    Authentication,
    /// Application records and their lifecycle
    Applications,
    /// Document upload, listing and retrieval
    Documents,
    /// Live updates pushed to clients
    Realtime,
    /// Usage and performance reporting
    Analytics,
}

impl Feature {
    /// All features, in routing-table order
    pub const ALL: [Feature; 5] = [
        Feature::Authentication,
        Feature::Applications,
        Feature::Documents,
        Feature::Realtime,
        Feature::Analytics,
    ];

    /// Kebab-case name used in storage, env vars and the CLI
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Authentication => "authentication",
            Feature::Applications => "applications",
            Feature::Documents => "documents",
            Feature::Realtime => "realtime",
            Feature::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authentication" => Ok(Feature::Authentication),
            "applications" => Ok(Feature::Applications),
            "documents" => Ok(Feature::Documents),
            "realtime" => Ok(Feature::Realtime),
            "analytics" => Ok(Feature::Analytics),
            other => Err(ConfigError::UnknownFeature(other.to_string())),
        }
    }
}

/// How a feature is routed
///
/// `Cognito` is only valid for [`Feature::Authentication`]; the routing
/// table rejects it elsewhere.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// Fixed routing to the legacy system
    Legacy,
    /// Fixed routing to the native system
    Native,
    /// Fixed routing to the Cognito-backed auth path
    Cognito,
    /// Routing decided per request by the A/B split policy
    AbTest,
}

impl FeatureMode {
    /// Name used in storage, env vars and the CLI
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureMode::Legacy => "legacy",
            FeatureMode::Native => "native",
            FeatureMode::Cognito => "cognito",
            FeatureMode::AbTest => "ab_test",
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(FeatureMode::Legacy),
            "native" => Ok(FeatureMode::Native),
            "cognito" => Ok(FeatureMode::Cognito),
            "ab_test" => Ok(FeatureMode::AbTest),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// One of exactly two backing systems a request can land on
///
/// Every recorded [`PerformanceSample`] and every statistics partition
/// carries a `Backend`, never a [`Route`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The pre-migration implementation path
    Legacy,
    /// The AWS-direct implementation path
    Native,
}

impl Backend {
    /// Name used in storage and the CLI
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Legacy => "legacy",
            Backend::Native => "native",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Backend::Legacy),
            "native" => Ok(Backend::Native),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// A resolver's answer for one request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Handle on the legacy system
    Legacy,
    /// Handle on the native system
    Native,
    /// Handle on the Cognito auth path
    Cognito,
}

impl Route {
    /// Name used in storage and the CLI
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Legacy => "legacy",
            Route::Native => "native",
            Route::Cognito => "cognito",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Backend> for Route {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Legacy => Route::Legacy,
            Backend::Native => Route::Native,
        }
    }
}

impl TryFrom<Route> for Backend {
    type Error = ConfigError;

    fn try_from(route: Route) -> Result<Self, Self::Error> {
        match route {
            Route::Legacy => Ok(Backend::Legacy),
            Route::Native => Ok(Backend::Native),
            Route::Cognito => Err(ConfigError::UnknownBackend("cognito".to_string())),
        }
    }
}

impl FromStr for Route {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Route::Legacy),
            "native" => Ok(Route::Native),
            "cognito" => Ok(Route::Cognito),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// One tracked operation against one of the two backing systems
///
/// Append-only; the recorder owns retention and eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Which system handled the operation
    pub backend: Backend,
    /// Which feature the operation belongs to
    pub feature: Feature,
    /// Operation name, e.g. `list-applications`
    pub operation: String,
    /// Wall-clock latency of the operation
    pub latency_ms: f64,
    /// Whether the operation succeeded
    pub success: bool,
    /// The wrapped operation's own error, captured rather than re-thrown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock capture time
    pub at: DateTime<Utc>,
    /// Identity of the caller, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PerformanceSample {
    /// Create a successful sample
    #[must_use]
    pub fn ok(
        backend: Backend,
        feature: Feature,
        operation: impl Into<String>,
        latency_ms: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            backend,
            feature,
            operation: operation.into(),
            latency_ms,
            success: true,
            error: None,
            at,
            user: None,
        }
    }

    /// Create a failed sample carrying the operation's error text
    #[must_use]
    pub fn failed(
        backend: Backend,
        feature: Feature,
        operation: impl Into<String>,
        latency_ms: f64,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            backend,
            feature,
            operation: operation.into(),
            latency_ms,
            success: false,
            error: Some(error.into()),
            at,
            user: None,
        }
    }

    /// Attach the caller's identity
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn feature_round_trips_through_str() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn mode_round_trips_through_str() {
        for mode in [
            FeatureMode::Legacy,
            FeatureMode::Native,
            FeatureMode::Cognito,
            FeatureMode::AbTest,
        ] {
            assert_eq!(mode.as_str().parse::<FeatureMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_feature_is_rejected() {
        assert!("payments".parse::<Feature>().is_err());
    }

    #[test]
    fn backend_converts_into_route() {
        assert_eq!(Route::from(Backend::Legacy), Route::Legacy);
        assert_eq!(Route::from(Backend::Native), Route::Native);
    }

    #[test]
    fn cognito_route_is_not_a_backend() {
        assert!(Backend::try_from(Route::Cognito).is_err());
        assert_eq!(Backend::try_from(Route::Native).unwrap(), Backend::Native);
    }

    #[test]
    fn sample_serializes_without_empty_optionals() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let sample = PerformanceSample::ok(
            Backend::Native,
            Feature::Documents,
            "upload-document",
            120.0,
            at,
        );
        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("error"));
        assert!(!json.contains("user"));

        let back: PerformanceSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
