//! Assignment, metrics, comparison and rollback engine
//!
//! Four cooperating components behind one dependency-injected facade:
//! 1. **Assignment Resolver**: decides which backing system handles a
//!    request (fixed mode, deterministic user split, or random split)
//! 2. **Metric Recorder**: bounded buffer of per-operation samples with
//!    best-effort persistence
//! 3. **Comparison Engine**: pure aggregation of samples into per-backend
//!    statistics and relative improvement
//! 4. **Rollback Monitor**: threshold evaluation that force-reverts every
//!    feature to the legacy system on breach
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cutover_engine::CutoverBuilder;
//! use cutover_core::{Backend, CutoverConfig, Feature};
//!
//! let service = CutoverBuilder::new()
//!     .with_config(CutoverConfig::from_env())
//!     .build();
//!
//! let route = service.route(Feature::Documents, Some("user-42"));
//! service.observe(Backend::Native, Feature::Documents, "upload", 120.0, true, None, None);
//! let report = service.report(Some(Feature::Documents), None);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod assign;
pub mod compare;
pub mod janitor;
pub mod monitor;
pub mod recorder;
pub mod service;

pub use assign::{AssignmentResolver, UserAssignmentCache};
pub use compare::compare;
pub use janitor::Janitor;
pub use monitor::{
    MonitorState, RollbackEvent, RollbackMonitor, RollbackSink, RollbackTrigger, TracingSink,
};
pub use recorder::MetricRecorder;
pub use service::{CutoverBuilder, CutoverService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
