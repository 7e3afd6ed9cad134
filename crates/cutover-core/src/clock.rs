//! Wall-clock seam
//!
//! Window filtering, retention pruning and sample stamping all read time
//! through [`Clock`] so tests can drive it manually.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
