//! rsm-status
//!
//! Per-region liveness, presentation ordering, consecutive-failure tracking
//! and the restart countdown.
//!
//! Architectural decisions:
//! - Feed failure outranks heartbeat freshness (a region whose player list
//!   could not be fetched is offline even with a fresh heartbeat)
//! - A missing or unparsable heartbeat is stale
//! - Presentation order is a total order over all regions, never a filter
//! - Failure counters reset on the first non-failing tick; recovery is
//!   driven by per-feed counts, not by the region verdict
//!
//! Pure deterministic logic. No IO, no wall-clock; the caller passes `now`.

mod failures;
mod liveness;
mod ordering;
mod restart;
mod types;

pub use failures::{FailureAction, FailureCounter, FeedKind};
pub use liveness::{evaluate, LivenessPolicy};
pub use ordering::order_regions;
pub use restart::{restart_countdown, RestartCountdown, RestartPolicy};
pub use types::*;
