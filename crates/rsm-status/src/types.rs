use std::fmt;

use rsm_roster::RegionRoster;
use rsm_schemas::QueueEntry;
use serde::{Deserialize, Serialize};

use crate::restart::RestartCountdown;

/// Why a region is online or offline this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictReason {
    Healthy,
    StaleHeartbeat,
    FeedUnavailable,
    FeedTimeout,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::Healthy => "healthy",
            VerdictReason::StaleHeartbeat => "stale_heartbeat",
            VerdictReason::FeedUnavailable => "feed_unavailable",
            VerdictReason::FeedTimeout => "feed_timeout",
        }
    }

    /// The region's feeds failed outright (as opposed to reporting stale data).
    pub fn is_feed_failure(&self) -> bool {
        matches!(self, VerdictReason::FeedUnavailable | VerdictReason::FeedTimeout)
    }
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionVerdict {
    pub region: String,
    pub online: bool,
    pub reason: VerdictReason,
}

impl RegionVerdict {
    pub fn online(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            online: true,
            reason: VerdictReason::Healthy,
        }
    }

    pub fn offline(region: impl Into<String>, reason: VerdictReason) -> Self {
        Self {
            region: region.into(),
            online: false,
            reason,
        }
    }
}

/// Everything the presentation layer needs for one region on one tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionReport {
    pub verdict: RegionVerdict,
    pub roster: RegionRoster,
    pub queue: Option<QueueEntry>,
    pub restart: Option<RestartCountdown>,
}

impl RegionReport {
    pub fn region(&self) -> &str {
        &self.verdict.region
    }
}
