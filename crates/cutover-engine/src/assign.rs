//! Assignment resolution
//!
//! Decides which backing system handles a request:
//! - Fixed modes return directly, no randomness
//! - Admin identities get the configured override
//! - Deterministic per-user splits hash the identity once and cache it
//! - Anonymous callers are assigned uniformly at random per call

use cutover_core::{Backend, CutoverConfig, Feature, FeatureMode, IdentityHasher, Route};
use dashmap::DashMap;
use rand::{Rng, RngCore};

/// Session-lived map from user identity to resolved backend
///
/// Populated lazily on first resolution per user, never persisted. Keeps a
/// given user's experience stable across repeated calls within a session.
#[derive(Debug, Default)]
pub struct UserAssignmentCache {
    inner: DashMap<String, Backend>,
}

impl UserAssignmentCache {
    /// Create an empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously resolved backend for this user, if any
    #[inline]
    #[must_use]
    pub fn get(&self, user: &str) -> Option<Backend> {
        self.inner.get(user).map(|entry| *entry)
    }

    /// Remember a user's resolved backend for the rest of the session
    #[inline]
    pub fn insert(&self, user: &str, backend: Backend) {
        self.inner.insert(user.to_string(), backend);
    }

    /// Forget every assignment (policy change, reset)
    #[inline]
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Number of users with a cached assignment
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no user has a cached assignment
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Resolves `(feature, user)` pairs onto routes
pub struct AssignmentResolver {
    hasher: Box<dyn IdentityHasher>,
    cache: UserAssignmentCache,
}

impl std::fmt::Debug for AssignmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentResolver")
            .field("cached_users", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AssignmentResolver {
    /// Create a resolver around an identity hasher
    #[must_use]
    pub fn new(hasher: Box<dyn IdentityHasher>) -> Self {
        Self {
            hasher,
            cache: UserAssignmentCache::new(),
        }
    }

    /// The session assignment cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &UserAssignmentCache {
        &self.cache
    }

    /// Resolve which system handles a request
    ///
    /// Resolution for a `(feature, user)` pair is deterministic for the
    /// lifetime of the cache entry. Anonymous callers under an A/B split
    /// are assigned uniformly at random on every call and can flip-flop
    /// between systems, a weakness inherited from the system this
    /// replaces and kept for behavioral parity.
    pub fn resolve(
        &self,
        config: &CutoverConfig,
        feature: Feature,
        user: Option<&str>,
        rng: &mut dyn RngCore,
    ) -> Route {
        match config.routing.mode(feature) {
            FeatureMode::Legacy => Route::Legacy,
            FeatureMode::Native => Route::Native,
            FeatureMode::Cognito => Route::Cognito,
            FeatureMode::AbTest => self.resolve_split(&config.policy, user, rng),
        }
    }

    fn resolve_split(
        &self,
        policy: &cutover_core::AbTestPolicy,
        user: Option<&str>,
        rng: &mut dyn RngCore,
    ) -> Route {
        // Admin identities bypass the split. Substring matching is a
        // deliberately weak heuristic carried over from the replaced
        // system; treat it as a convenience, not an access control.
        if let Some(user) = user {
            if user.contains("admin") {
                if let Some(override_route) = policy.admin_override {
                    return override_route;
                }
            }
        }

        if !policy.enabled {
            return Route::Legacy;
        }

        if policy.split_by_user {
            if let Some(user) = user {
                if let Some(cached) = self.cache.get(user) {
                    return cached.into();
                }
                let bucket = self.hasher.bucket(user);
                let backend = if bucket < policy.split_percentage {
                    Backend::Native
                } else {
                    Backend::Legacy
                };
                self.cache.insert(user, backend);
                return backend.into();
            }
        }

        // Anonymous (or per-call) split: uniform draw, never cached.
        if rng.random_range(0..100u8) < policy.split_percentage {
            Route::Native
        } else {
            Route::Legacy
        }
    }
}
