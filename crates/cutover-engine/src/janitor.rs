//! Background retention sweep
//!
//! The engine's one piece of scheduled activity: a fixed-interval task
//! that prunes samples past the retention horizon. The service never
//! spawns anything itself; long-lived hosts opt in by spawning a janitor
//! on their runtime.

use crate::service::CutoverService;
use cutover_core::PRUNE_INTERVAL_SECS;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to the sweep task; aborts the task when dropped
#[derive(Debug)]
pub struct Janitor {
    handle: JoinHandle<()>,
}

impl Janitor {
    /// Spawn a sweep on the current tokio runtime with the given period
    #[must_use]
    pub fn spawn(service: Arc<CutoverService>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the sweep
            // runs one full period after spawn.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = service.prune();
                if removed > 0 {
                    tracing::debug!("pruned {removed} expired samples");
                }
            }
        });
        Self { handle }
    }

    /// Spawn with the default hourly period
    #[must_use]
    pub fn spawn_hourly(service: Arc<CutoverService>) -> Self {
        Self::spawn(service, Duration::from_secs(PRUNE_INTERVAL_SECS))
    }

    /// Stop the sweep
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CutoverBuilder;
    use chrono::Utc;
    use cutover_core::{Backend, Feature, PerformanceSample};

    #[tokio::test(start_paused = true)]
    async fn sweep_prunes_expired_samples() {
        let service = Arc::new(CutoverBuilder::new().build());
        let expired = PerformanceSample::ok(
            Backend::Native,
            Feature::Documents,
            "op",
            10.0,
            Utc::now() - chrono::Duration::hours(25),
        );
        service.record(expired);
        assert_eq!(service.sample_count(), 1);

        let janitor = Janitor::spawn(Arc::clone(&service), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        // Let the sweep task run its tick.
        tokio::task::yield_now().await;

        assert_eq!(service.sample_count(), 0);
        janitor.shutdown();
    }
}
