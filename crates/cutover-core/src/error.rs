//! Configuration error types

use crate::types::{Feature, FeatureMode};

/// Errors raised by configuration validation and parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Feature name not in the closed set
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Mode name not in the closed set
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// Backend name not in the closed set
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// Mode not valid for this feature (Cognito is auth-only)
    #[error("mode {mode} is not valid for feature {feature}")]
    InvalidMode {
        /// The feature being configured
        feature: Feature,
        /// The rejected mode
        mode: FeatureMode,
    },

    /// Split percentage outside 0–100
    #[error("split percentage {0} is out of range (0-100)")]
    InvalidSplit(u8),

    /// Sample rate outside 0.0–1.0
    #[error("sample rate {0} is out of range (0.0-1.0)")]
    InvalidRate(f64),

    /// Threshold must be positive
    #[error("threshold {value} for {name} must be positive")]
    InvalidThreshold {
        /// Which threshold was rejected
        name: &'static str,
        /// The rejected value
        value: f64,
    },
}
