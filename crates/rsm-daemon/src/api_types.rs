//! Response types for the rsm-daemon status API.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

/// One region as evaluated by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub online: bool,
    /// `healthy` | `stale_heartbeat` | `feed_unavailable` | `feed_timeout`
    pub reason: String,
    /// Organization members online (associates excluded).
    pub org_online: usize,
    /// Classified players shown on the card.
    pub shown_players: usize,
    /// Consecutive failed passes after this one.
    pub consecutive_failures: u32,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// `false` when no region is configured and the pass did nothing.
    pub regions_configured: bool,
    pub directory_members: usize,
    pub directory_refreshed: bool,
    /// Regions in presentation order.
    pub regions: Vec<RegionSummary>,
    /// Region bound to each slot after the pass, in slot order.
    pub slots: Vec<Option<String>>,
    pub slots_created: usize,
    pub slots_updated: usize,
    pub publish_failures: usize,
}
