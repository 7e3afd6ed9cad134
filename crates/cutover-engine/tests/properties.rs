//! Universal properties of assignment resolution and recording
//!
//! Property-based checks over arbitrary user identities and split
//! percentages.

use cutover_core::{AbTestPolicy, CutoverConfig, Feature, FeatureMode, IdentityHasher, PolynomialHasher, Route};
use cutover_engine::AssignmentResolver;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn ab_config(policy: AbTestPolicy) -> CutoverConfig {
    let mut config = CutoverConfig::new().with_policy(policy);
    for feature in Feature::ALL {
        config
            .routing
            .set_mode(feature, FeatureMode::AbTest)
            .unwrap();
    }
    config
}

fn resolver() -> AssignmentResolver {
    AssignmentResolver::new(Box::new(PolynomialHasher::new()))
}

proptest! {
    /// Resolution for a (feature, user) pair is deterministic within a
    /// session under a user-based split.
    #[test]
    fn user_split_is_deterministic(user in "\\PC{1,40}", split in 0u8..=100) {
        let config = ab_config(
            AbTestPolicy::default().with_enabled(true).with_split(split),
        );
        let resolver = resolver();
        let mut rng = StdRng::seed_from_u64(1);

        let first = resolver.resolve(&config, Feature::Documents, Some(&user), &mut rng);
        let second = resolver.resolve(&config, Feature::Documents, Some(&user), &mut rng);
        prop_assert_eq!(first, second);
    }

    /// Split 0 never assigns native, regardless of identity.
    #[test]
    fn split_zero_never_assigns_native(user in "\\PC{1,40}") {
        let config = ab_config(AbTestPolicy::default().with_enabled(true).with_split(0));
        let resolver = resolver();
        let mut rng = StdRng::seed_from_u64(1);

        let route = resolver.resolve(&config, Feature::Documents, Some(&user), &mut rng);
        prop_assert_eq!(route, Route::Legacy);
    }

    /// Split 100 always assigns native.
    #[test]
    fn split_hundred_always_assigns_native(user in "\\PC{1,40}") {
        let config = ab_config(AbTestPolicy::default().with_enabled(true).with_split(100));
        let resolver = resolver();
        let mut rng = StdRng::seed_from_u64(1);

        let route = resolver.resolve(&config, Feature::Documents, Some(&user), &mut rng);
        prop_assert_eq!(route, Route::Native);
    }

    /// Anonymous resolution respects the split extremes too.
    #[test]
    fn anonymous_split_respects_extremes(seed in 0u64..1000) {
        let resolver = resolver();
        let mut rng = StdRng::seed_from_u64(seed);

        let all_legacy = ab_config(AbTestPolicy::default().with_enabled(true).with_split(0));
        prop_assert_eq!(
            resolver.resolve(&all_legacy, Feature::Documents, None, &mut rng),
            Route::Legacy
        );

        let all_native = ab_config(AbTestPolicy::default().with_enabled(true).with_split(100));
        prop_assert_eq!(
            resolver.resolve(&all_native, Feature::Documents, None, &mut rng),
            Route::Native
        );
    }

    /// The hash bucket alone decides the backend for user splits: an
    /// identity below the split threshold goes native, at or above it
    /// stays legacy.
    #[test]
    fn user_split_follows_the_bucket(user in "\\PC{1,40}", split in 0u8..=100) {
        let config = ab_config(
            AbTestPolicy::default().with_enabled(true).with_split(split),
        );
        let resolver = resolver();
        let hasher = PolynomialHasher::new();
        let mut rng = StdRng::seed_from_u64(1);

        let expected = if hasher.bucket(&user) < split {
            Route::Native
        } else {
            Route::Legacy
        };
        let route = resolver.resolve(&config, Feature::Documents, Some(&user), &mut rng);
        prop_assert_eq!(route, expected);
    }
}
