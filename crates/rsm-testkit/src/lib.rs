//! rsm-testkit
//!
//! In-memory fakes for every external seam of the monitor: the three feeds,
//! the member directory, the chat platform and the alert sink.
//!
//! Every fake is scriptable per region/message, counts its calls, and is
//! safe to share as `Arc<dyn Trait>` across the scheduler's concurrent
//! fetches. Delays use `tokio::time::sleep`, so timeout scenarios run
//! instantly under `#[tokio::test(start_paused = true)]`.

mod chat;
mod feeds;

pub use chat::{FakeAlertSink, FakeChat};
pub use feeds::{FakeDirectory, FakeInfoFeed, FakePlayerFeed, FakeQueueFeed};

use chrono::{DateTime, TimeZone, Utc};
use rsm_schemas::QueueEntry;

/// Fixed wall clock used by the scenario tests (Monday 2024-03-04 12:00 UTC).
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Queue entry with a heartbeat `age_secs` before `now`.
pub fn queue_entry(players: u32, age_secs: i64, now: DateTime<Utc>) -> QueueEntry {
    QueueEntry {
        players,
        max_players: 64,
        queued_players: 0,
        last_heartbeat: Some(now - chrono::Duration::seconds(age_secs)),
    }
}
