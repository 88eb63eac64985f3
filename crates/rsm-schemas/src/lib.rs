//! rsm-schemas
//!
//! Data shapes shared between the feed clients (`rsm-feeds`) and the pure
//! evaluation crates (`rsm-roster`, `rsm-status`).
//!
//! Everything here is already decoded from the upstream wire format: the
//! HTTP clients own the wire structs and map into these types, so the rest
//! of the workspace never sees a raw JSON payload.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Player feed
// ---------------------------------------------------------------------------

/// One entry of a region's live player list, exactly as reported upstream.
///
/// Ephemeral: only lives for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayerRecord {
    pub username: String,
}

impl RawPlayerRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue / heartbeat feed
// ---------------------------------------------------------------------------

/// Population and heartbeat for a single region from the global queue feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub players: u32,
    pub max_players: u32,
    pub queued_players: u32,
    /// `None` when upstream omitted the timestamp or sent one we could not
    /// parse. Liveness treats a missing heartbeat as stale.
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// The whole queue feed, keyed by configured region name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: BTreeMap<String, QueueEntry>,
}

impl QueueSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, region: &str) -> Option<&QueueEntry> {
        self.entries.get(region)
    }

    pub fn insert(&mut self, region: impl Into<String>, entry: QueueEntry) {
        self.entries.insert(region.into(), entry);
    }
}

// ---------------------------------------------------------------------------
// Server-info feed
// ---------------------------------------------------------------------------

/// Per-region server info. Only the in-simulation clock is consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// In-simulation weekly clock, `"<Weekday> HH:MM"` (e.g. `"Monday 05:59"`).
    pub time: Option<String>,
}

impl ServerInfo {
    pub fn with_time(time: impl Into<String>) -> Self {
        Self {
            time: Some(time.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed errors
// ---------------------------------------------------------------------------

/// Which upstream a fetch went to. Used for log fields and alert text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedKind {
    Players,
    Queue,
    ServerInfo,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Players => "players",
            FeedKind::Queue => "queue",
            FeedKind::ServerInfo => "server_info",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed upstream fetch.
///
/// A timed-out fetch is reported separately so liveness can carry the more
/// specific reason, but both variants mean "no data this tick".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Transport failure, non-success status, or an undecodable payload.
    Unavailable(String),
    /// The fetch did not complete within its bound.
    Timeout { after: Duration },
}

impl FeedError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        FeedError::Unavailable(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FeedError::Timeout { .. })
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Unavailable(msg) => write!(f, "feed unavailable: {msg}"),
            FeedError::Timeout { after } => {
                write!(f, "feed timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for FeedError {}

pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_error_display() {
        assert_eq!(
            FeedError::unavailable("connection refused").to_string(),
            "feed unavailable: connection refused"
        );
        assert_eq!(
            FeedError::Timeout {
                after: Duration::from_secs(3)
            }
            .to_string(),
            "feed timed out after 3000ms"
        );
    }

    #[test]
    fn queue_snapshot_lookup_by_region() {
        let mut snap = QueueSnapshot::empty();
        snap.insert(
            "EU1",
            QueueEntry {
                players: 120,
                max_players: 128,
                queued_players: 4,
                last_heartbeat: None,
            },
        );
        assert_eq!(snap.get("EU1").map(|e| e.players), Some(120));
        assert!(snap.get("NA1").is_none());
    }
}
