//! Service facade
//!
//! [`CutoverService`] wires the resolver, recorder, comparison engine and
//! rollback monitor behind one explicitly constructed instance: build it
//! once at application start via [`CutoverBuilder`], pass it by reference
//! to consumers. All mutable state sits behind a single mutex; every
//! operation is synchronous and none suspends.
//!
//! Persistence is best-effort by policy: a failing store write is logged
//! and otherwise discarded, so storage trouble degrades to "metrics not
//! recorded" rather than breaking the request path.

use crate::assign::AssignmentResolver;
use crate::compare::compare;
use crate::monitor::{RollbackEvent, RollbackMonitor, RollbackSink, RollbackTrigger, TracingSink};
use crate::recorder::MetricRecorder;
use crate::MonitorState;
use chrono::Duration;
use cutover_core::{
    AbTestPolicy, Backend, Clock, Comparison, ConfigError, CutoverConfig, Feature, FeatureMode,
    IdentityHasher, PerformanceSample, PolynomialHasher, Route, SystemClock, Thresholds,
    DEFAULT_COMPARE_WINDOW_MINUTES, MEMORY_SAMPLE_CAP, PERSISTED_SAMPLE_CAP, RETENTION_HOURS,
};
use cutover_store::{codec, MemoryStore, Store, CONFIG_KEY, SAMPLES_KEY};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

struct EngineState {
    config: CutoverConfig,
    recorder: MetricRecorder,
    monitor: RollbackMonitor,
    rng: Box<dyn RngCore + Send>,
}

/// Builder for [`CutoverService`]
///
/// Every seam is injectable; the defaults are an in-memory store, the
/// system clock, an OS-seeded RNG, the polynomial identity hasher and a
/// log-based rollback sink.
pub struct CutoverBuilder {
    config: CutoverConfig,
    store: Box<dyn Store>,
    clock: Box<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
    hasher: Box<dyn IdentityHasher>,
    sink: Box<dyn RollbackSink>,
}

impl Default for CutoverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CutoverBuilder {
    /// Start from defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CutoverConfig::default(),
            store: Box::new(MemoryStore::new()),
            clock: Box::new(SystemClock),
            rng: Box::new(StdRng::from_os_rng()),
            hasher: Box::new(PolynomialHasher::new()),
            sink: Box::new(TracingSink),
        }
    }

    /// Baseline configuration used when nothing valid is persisted
    #[must_use]
    pub fn with_config(mut self, config: CutoverConfig) -> Self {
        self.config = config;
        self
    }

    /// Persistence backend
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn Store>) -> Self {
        self.store = store;
        self
    }

    /// Wall-clock source
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Random source for anonymous splits and the sampling filter
    #[must_use]
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Identity hasher for deterministic user splits
    #[must_use]
    pub fn with_hasher(mut self, hasher: Box<dyn IdentityHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Rollback notification sink
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn RollbackSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Load persisted state and assemble the service
    ///
    /// A missing, unreadable or malformed persisted record falls back to
    /// the builder's baseline and is logged at warn level; startup never
    /// fails on storage trouble.
    #[must_use]
    pub fn build(self) -> CutoverService {
        let defaults = self.config.clone();

        let config = match load_record::<CutoverConfig>(self.store.as_ref(), CONFIG_KEY) {
            Some(loaded) => match loaded.validate() {
                Ok(()) => loaded,
                Err(err) => {
                    tracing::warn!("persisted configuration is invalid ({err}); using defaults");
                    defaults.clone()
                }
            },
            None => defaults.clone(),
        };

        let samples = load_record::<Vec<PerformanceSample>>(self.store.as_ref(), SAMPLES_KEY)
            .unwrap_or_default();

        CutoverService {
            store: self.store,
            clock: self.clock,
            sink: self.sink,
            resolver: AssignmentResolver::new(self.hasher),
            defaults,
            state: Mutex::new(EngineState {
                config,
                recorder: MetricRecorder::with_samples(samples, MEMORY_SAMPLE_CAP),
                monitor: RollbackMonitor::new(),
                rng: self.rng,
            }),
        }
    }
}

fn load_record<T: serde::de::DeserializeOwned>(store: &dyn Store, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match codec::decode(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("replacing malformed record {key} with defaults: {err}");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!("failed to read record {key}: {err}");
            None
        }
    }
}

/// The migration engine behind one injected, shareable instance
pub struct CutoverService {
    store: Box<dyn Store>,
    clock: Box<dyn Clock>,
    sink: Box<dyn RollbackSink>,
    resolver: AssignmentResolver,
    defaults: CutoverConfig,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for CutoverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoverService")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl CutoverService {
    /// Decide which system handles a request for `feature`
    ///
    /// Deterministic for a `(feature, user)` pair while the session cache
    /// holds the user; anonymous callers under an A/B split are assigned
    /// per call.
    pub fn route(&self, feature: Feature, user: Option<&str>) -> Route {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.resolver
            .resolve(&state.config, feature, user, state.rng.as_mut())
    }

    /// Record one tracked operation
    ///
    /// Applies the sampling filter, appends to the bounded buffer,
    /// persists the recent tail best-effort and then evaluates the
    /// rollback monitor synchronously.
    pub fn record(&self, sample: PerformanceSample) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !MetricRecorder::admits(state.config.thresholds.sample_rate, state.rng.as_mut()) {
            return;
        }

        state.recorder.push(sample);
        self.persist_samples(&state.recorder);

        if let Some(event) = self.run_monitor(state) {
            drop(guard);
            self.sink.notify(&event);
        }
    }

    /// Evaluate rollback thresholds immediately
    ///
    /// Runs the same assessment that follows every recorded sample; useful
    /// for hosts that want a check between samples.
    pub fn evaluate(&self) {
        let mut guard = self.state.lock();
        if let Some(event) = self.run_monitor(&mut guard) {
            drop(guard);
            self.sink.notify(&event);
        }
    }

    /// Assess thresholds and, on breach, apply the rollback mutation.
    /// Notification stays with the caller so the lock can be released
    /// first.
    fn run_monitor(&self, state: &mut EngineState) -> Option<RollbackEvent> {
        let now = self.clock.now();
        let decision = state
            .monitor
            .assess(&state.config.thresholds, state.recorder.iter(), now);
        if decision.is_some() {
            state.config.routing.force_all_legacy();
            state.monitor.mark_rolled_back();
            self.persist_config(&state.config);
        }
        decision
    }

    /// Capture and record an operation stamped with the service clock
    #[allow(clippy::too_many_arguments)]
    pub fn observe(
        &self,
        backend: Backend,
        feature: Feature,
        operation: &str,
        latency_ms: f64,
        success: bool,
        error: Option<&str>,
        user: Option<&str>,
    ) {
        let at = self.clock.now();
        let mut sample = if success {
            PerformanceSample::ok(backend, feature, operation, latency_ms, at)
        } else {
            PerformanceSample::failed(
                backend,
                feature,
                operation,
                latency_ms,
                error.unwrap_or("unknown error"),
                at,
            )
        };
        if let Some(user) = user {
            sample = sample.with_user(user);
        }
        self.record(sample);
    }

    /// Aggregate buffered samples into a side-by-side report
    ///
    /// Pure read; defaults to the trailing hour when no window is given.
    #[must_use]
    pub fn report(&self, feature: Option<Feature>, window_minutes: Option<u32>) -> Comparison {
        let guard = self.state.lock();
        let window = Duration::minutes(i64::from(
            window_minutes.unwrap_or(DEFAULT_COMPARE_WINDOW_MINUTES),
        ));
        compare(guard.recorder.iter(), feature, window, self.clock.now())
    }

    /// Admin mutation: set one feature's routing mode
    ///
    /// Persists the configuration and, as the explicit operator edit,
    /// releases the rolled-back latch.
    ///
    /// # Errors
    /// [`ConfigError::InvalidMode`] for `Cognito` outside authentication.
    pub fn set_mode(&self, feature: Feature, mode: FeatureMode) -> Result<(), ConfigError> {
        let mut guard = self.state.lock();
        guard.config.routing.set_mode(feature, mode)?;
        guard.monitor.acknowledge();
        self.persist_config(&guard.config);
        Ok(())
    }

    /// Admin mutation: replace the A/B policy
    ///
    /// Clears the per-user assignment cache so the new split applies
    /// from the next resolution on.
    ///
    /// # Errors
    /// [`ConfigError::InvalidSplit`] for a split percentage above 100.
    pub fn set_policy(&self, policy: AbTestPolicy) -> Result<(), ConfigError> {
        policy.validate()?;
        let mut guard = self.state.lock();
        guard.config.policy = policy;
        guard.monitor.acknowledge();
        self.persist_config(&guard.config);
        drop(guard);
        self.resolver.cache().clear();
        Ok(())
    }

    /// Admin mutation: replace the rollback thresholds
    ///
    /// # Errors
    /// Validation failure from [`Thresholds::validate`].
    pub fn set_thresholds(&self, thresholds: Thresholds) -> Result<(), ConfigError> {
        thresholds.validate()?;
        let mut guard = self.state.lock();
        guard.config.thresholds = thresholds;
        guard.monitor.acknowledge();
        self.persist_config(&guard.config);
        Ok(())
    }

    /// Operator-initiated rollback through the same path the monitor uses
    pub fn force_rollback(&self, reason: impl Into<String>) {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let window = Duration::minutes(i64::from(state.config.thresholds.monitor_window_minutes));
        let report = compare(state.recorder.iter(), None, window, now);

        state.config.routing.force_all_legacy();
        state.monitor.mark_rolled_back();
        self.persist_config(&state.config);

        let event = RollbackEvent {
            trigger: RollbackTrigger::Manual {
                reason: reason.into(),
            },
            native: report.native,
            at: now,
        };
        drop(guard);
        self.sink.notify(&event);
    }

    /// Restore the builder's baseline, clearing samples and assignments
    pub fn reset(&self) {
        let mut guard = self.state.lock();
        guard.config = self.defaults.clone();
        guard.recorder.clear();
        guard.monitor.acknowledge();
        self.persist_config(&guard.config);
        self.persist_samples(&guard.recorder);
        drop(guard);
        self.resolver.cache().clear();
    }

    /// Drop samples older than the retention horizon
    ///
    /// Returns how many samples were removed. Called by the hourly sweep.
    pub fn prune(&self) -> usize {
        let cutoff = self.clock.now() - Duration::hours(RETENTION_HOURS);
        let mut guard = self.state.lock();
        let removed = guard.recorder.prune_before(cutoff);
        if removed > 0 {
            self.persist_samples(&guard.recorder);
        }
        removed
    }

    /// Current monitor state
    #[must_use]
    pub fn monitor_state(&self) -> MonitorState {
        self.state.lock().monitor.state()
    }

    /// Snapshot of the current configuration
    #[must_use]
    pub fn config(&self) -> CutoverConfig {
        self.state.lock().config.clone()
    }

    /// Number of samples currently buffered
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.state.lock().recorder.len()
    }

    /// Number of users with a cached split assignment
    #[must_use]
    pub fn cached_assignments(&self) -> usize {
        self.resolver.cache().len()
    }

    fn persist_config(&self, config: &CutoverConfig) {
        match codec::encode(config) {
            Ok(raw) => {
                if let Err(err) = self.store.put(CONFIG_KEY, &raw) {
                    tracing::warn!("failed to persist configuration: {err}");
                }
            }
            Err(err) => tracing::warn!("failed to encode configuration: {err}"),
        }
    }

    fn persist_samples(&self, recorder: &MetricRecorder) {
        let tail = recorder.recent(PERSISTED_SAMPLE_CAP);
        match codec::encode(&tail) {
            Ok(raw) => {
                if let Err(err) = self.store.put(SAMPLES_KEY, &raw) {
                    tracing::debug!("failed to persist samples: {err}");
                }
            }
            Err(err) => tracing::debug!("failed to encode samples: {err}"),
        }
    }
}
