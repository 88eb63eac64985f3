use std::time::Duration;

use chrono::{DateTime, Utc};
use rsm_schemas::{FeedError, FeedResult, QueueSnapshot, RawPlayerRecord, ServerInfo};

use crate::types::{RegionVerdict, VerdictReason};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LivenessPolicy {
    /// A heartbeat older than this is stale.
    pub stale_after: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(600),
        }
    }
}

/// Combine one region's feed results into a verdict.
///
/// Decision order (first match wins):
/// 1. player fetch failed -> `FeedUnavailable`, timed out -> `FeedTimeout`
/// 2. server-info fetch failed or timed out -> `FeedUnavailable`
/// 3. no queue entry for the region (including a failed queue fetch), no
///    heartbeat, or a heartbeat older than `stale_after` -> `StaleHeartbeat`
/// 4. `Healthy`
pub fn evaluate(
    region: &str,
    players: &FeedResult<Vec<RawPlayerRecord>>,
    queue: &FeedResult<QueueSnapshot>,
    info: &FeedResult<ServerInfo>,
    now: DateTime<Utc>,
    policy: &LivenessPolicy,
) -> RegionVerdict {
    if let Err(err) = players {
        let reason = match err {
            FeedError::Timeout { .. } => VerdictReason::FeedTimeout,
            FeedError::Unavailable(_) => VerdictReason::FeedUnavailable,
        };
        return RegionVerdict::offline(region, reason);
    }

    if info.is_err() {
        return RegionVerdict::offline(region, VerdictReason::FeedUnavailable);
    }

    let heartbeat = queue
        .as_ref()
        .ok()
        .and_then(|q| q.get(region))
        .and_then(|e| e.last_heartbeat);
    let Some(heartbeat) = heartbeat else {
        return RegionVerdict::offline(region, VerdictReason::StaleHeartbeat);
    };
    if is_stale(heartbeat, now, policy.stale_after) {
        return RegionVerdict::offline(region, VerdictReason::StaleHeartbeat);
    }

    RegionVerdict::online(region)
}

fn is_stale(heartbeat: DateTime<Utc>, now: DateTime<Utc>, stale_after: Duration) -> bool {
    // Heartbeats from the future (clock skew) count as fresh.
    match now.signed_duration_since(heartbeat).to_std() {
        Ok(age) => age > stale_after,
        Err(_) => false,
    }
}
