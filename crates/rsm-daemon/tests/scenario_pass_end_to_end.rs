//! Scenario: full reconciliation passes against in-memory collaborators.
//!
//! # Invariants under test
//!
//! 1. First pass creates one slot per region and binds them in presentation
//!    order; a second identical pass creates nothing and rebinds the same
//!    regions (idempotent binding). The persisted table matches memory.
//! 2. Online regions come first in preferred order, then offline regions in
//!    preferred order; every region gets exactly one slot.
//! 3. A player fetch that times out makes the region offline with
//!    `feed_timeout` even when its heartbeat is fresh.
//! 4. A slot whose update keeps failing transiently is retried 3 times,
//!    produces exactly one critical alert, and keeps its message id and
//!    previous region binding; the other slots are still updated.
//! 5. Two passes inside the directory TTL fetch the directory once.
//! 6. A failed directory refresh keeps classifying with the previous
//!    snapshot and raises an alert.
//! 7. No configured region: every pass alerts CONFIG_MISSING and publishes
//!    nothing.
//! 8. A region whose server-info fetch fails `failure_threshold` passes in a
//!    row has its endpoint re-resolved, again every `threshold` passes while
//!    it stays down. A failing player feed alone never triggers that.
//! 9. The loop runs one pass per interval and stops on shutdown.
//! 10. A directory listing that never answers is abandoned after its
//!     timeout: the pass still publishes every slot, alerts, and the next
//!     pass retries the refresh.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use rsm_config::{load_layered_yaml_from_strings, MonitorConfig};
use rsm_daemon::scheduler::{Collaborators, MonitorState, PassSettings, Scheduler};
use rsm_daemon::state::AppState;
use rsm_publish::{EmojiSet, PublishError, SlotStore, COLOR_OFFLINE, COLOR_ONLINE};
use rsm_roster::DirectoryMember;
use rsm_schemas::{FeedError, QueueSnapshot};
use rsm_testkit::{
    queue_entry, t0, FakeAlertSink, FakeChat, FakeDirectory, FakeInfoFeed, FakePlayerFeed,
    FakeQueueFeed,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const REGIONS: [&str; 5] = ["EU1", "EU2", "NA1", "NA2", "SEA"];
const PREFERRED: [&str; 5] = ["SEA", "NA2", "NA1", "EU2", "EU1"];

const BASE_YAML: &str = r#"
schedule:
  tick_interval_secs: 60
  directory_ttl_secs: 300
  stale_heartbeat_secs: 600
  failure_threshold: 3
regions:
  - name: EU1
  - name: EU2
  - name: NA1
    server_id: US1
  - name: NA2
    server_id: US2
  - name: SEA
presentation:
  preferred_order: [SEA, NA2, NA1, EU2, EU1]
directory:
  guild_id: 42
  org_tag: SWAT
  suffix_tags: [CADET, TRAINEE]
  roles: { leadership: 1, cadet: 2, trainee: 3, member: 4 }
  ranks:
    - { label: Mentor, role: 1 }
    - { label: Officer, role: 4 }
publish:
  channel_id: 777
  inter_slot_delay_ms: 0
alerts:
  window_secs: 0
"#;

fn config(overlay: &str) -> MonitorConfig {
    load_layered_yaml_from_strings(&[BASE_YAML, overlay])
        .unwrap()
        .monitor()
        .unwrap()
}

struct Harness {
    players: Arc<FakePlayerFeed>,
    queue: Arc<FakeQueueFeed>,
    info: Arc<FakeInfoFeed>,
    directory: Arc<FakeDirectory>,
    chat: Arc<FakeChat>,
    alerts: Arc<FakeAlertSink>,
    store: SlotStore,
    scheduler: Scheduler,
    _dir: tempfile::TempDir,
}

fn members() -> Vec<DirectoryMember> {
    vec![
        DirectoryMember::new(100, "[SWAT] Alice", [1, 4]),
        DirectoryMember::new(101, "Bob [CADET]", [2]),
        DirectoryMember::new(102, "Carol", [4]),
    ]
}

/// Every region healthy with a heartbeat 30 s before `now`.
fn healthy_queue(now: DateTime<Utc>) -> QueueSnapshot {
    let mut q = QueueSnapshot::empty();
    for r in REGIONS {
        q.insert(r, queue_entry(10, 30, now));
    }
    q
}

fn harness(cfg: &MonitorConfig) -> Harness {
    let players = Arc::new(FakePlayerFeed::new());
    for r in REGIONS {
        players.set_players(r, &[]);
    }
    players.set_players("SEA", &["[SWAT] Alice", "Bob", "Randomguy", "[SWAT] Ghost"]);

    let queue = Arc::new(FakeQueueFeed::new());
    queue.set_snapshot(healthy_queue(t0()));

    let info = Arc::new(FakeInfoFeed::new());
    let directory = Arc::new(FakeDirectory::new(members()));
    let chat = Arc::new(FakeChat::new());
    let alerts = Arc::new(FakeAlertSink::new());

    let dir = tempfile::tempdir().unwrap();
    let store = SlotStore::new(dir.path().join("slots.json"));

    let collab = Collaborators {
        players: players.clone(),
        queue: queue.clone(),
        info: info.clone(),
        directory: directory.clone(),
        chat: chat.clone(),
        alerts: alerts.clone(),
    };
    let scheduler = Scheduler::new(
        PassSettings::from_config(cfg, EmojiSet::default()),
        collab,
        MonitorState::new(cfg, store.load().unwrap()),
        store.clone(),
    );

    Harness {
        players,
        queue,
        info,
        directory,
        chat,
        alerts,
        store,
        scheduler,
        _dir: dir,
    }
}

fn secs(n: i64) -> chrono::Duration {
    chrono::Duration::seconds(n)
}

fn bound(regions: &[&str]) -> Vec<Option<String>> {
    regions.iter().map(|r| Some(r.to_string())).collect()
}

// ---------------------------------------------------------------------------
// 1. Idempotent binding
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn first_pass_creates_then_second_pass_only_updates() {
    let cfg = config("");
    let mut h = harness(&cfg);

    let first = h.scheduler.run_pass(t0()).await;
    assert_eq!(first.slots_created, 5);
    assert_eq!(first.slots_updated, 5);
    assert_eq!(first.slots, bound(&PREFERRED));
    assert_eq!(h.chat.created(), vec![1000, 1001, 1002, 1003, 1004]);

    let second = h.scheduler.run_pass(t0() + secs(60)).await;
    assert_eq!(second.slots_created, 0);
    assert_eq!(second.slots_updated, 5);
    assert_eq!(second.slots, first.slots);
    assert_eq!(h.chat.created().len(), 5, "no new messages on the second pass");
    assert_eq!(h.chat.total_edit_attempts(), 10);

    let persisted = h.store.load().unwrap();
    assert_eq!(&persisted, &h.scheduler.state().slots);
    let ids: Vec<u64> = persisted.slots.iter().map(|s| s.message_id).collect();
    assert_eq!(ids, vec![1000, 1001, 1002, 1003, 1004]);
    assert!(h.alerts.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn roster_is_classified_against_the_directory() {
    let cfg = config("");
    let mut h = harness(&cfg);

    let summary = h.scheduler.run_pass(t0()).await;

    let sea = summary.regions.iter().find(|r| r.region == "SEA").unwrap();
    assert!(sea.online);
    // Alice (leadership) + Ghost (tagged, unknown); Bob is a cadet associate;
    // Randomguy is not ours.
    assert_eq!(sea.org_online, 2);
    assert_eq!(sea.shown_players, 3);

    let card = h.chat.card(1000).unwrap();
    assert_eq!(card.color, COLOR_ONLINE);
    assert!(card.title.ends_with("SEA"));
    let text: String = card.fields.iter().map(|f| format!("{}{}", f.name, f.value)).collect();
    assert!(text.contains("Alice (<@100>)"));
    assert!(text.contains("Ghost (❔)"));
    assert!(text.contains("Bob (<@101>)"));
    assert!(!text.contains("Randomguy"));
}

// ---------------------------------------------------------------------------
// 2. Ordering
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn offline_regions_sink_below_online_ones() {
    let cfg = config("");
    let mut h = harness(&cfg);

    h.players.set_error("NA1", FeedError::unavailable("HTTP 502"));
    let mut q = healthy_queue(t0());
    q.insert("EU1", queue_entry(10, 3_600, t0()));
    h.queue.set_snapshot(q);

    let summary = h.scheduler.run_pass(t0()).await;

    let order: Vec<&str> = summary.regions.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(order, vec!["SEA", "NA2", "EU2", "NA1", "EU1"]);
    assert_eq!(summary.slots, bound(&["SEA", "NA2", "EU2", "NA1", "EU1"]));

    let reasons: Vec<(&str, &str)> = summary
        .regions
        .iter()
        .map(|r| (r.region.as_str(), r.reason.as_str()))
        .collect();
    assert!(reasons.contains(&("NA1", "feed_unavailable")));
    assert!(reasons.contains(&("EU1", "stale_heartbeat")));

    assert_eq!(h.chat.card(1003).unwrap().color, COLOR_OFFLINE);
    assert_eq!(h.chat.card(1004).unwrap().color, COLOR_OFFLINE);
    assert_eq!(h.chat.card(1002).unwrap().color, COLOR_ONLINE);
}

// ---------------------------------------------------------------------------
// 3. Player timeout beats a fresh heartbeat
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn player_timeout_is_offline_with_fresh_heartbeat() {
    let cfg = config("");
    let mut h = harness(&cfg);
    h.players.set_delay("NA2", Duration::from_secs(10));

    let summary = h.scheduler.run_pass(t0()).await;

    let na2 = summary.regions.iter().find(|r| r.region == "NA2").unwrap();
    assert!(!na2.online);
    assert_eq!(na2.reason, "feed_timeout");
    assert_eq!(na2.consecutive_failures, 1);
    // Moved behind every online region.
    assert_eq!(summary.regions.last().unwrap().region, "NA2");
}

// ---------------------------------------------------------------------------
// 4. Retry exhaustion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhausted_slot_alerts_once_and_keeps_its_record() {
    let cfg = config("");
    let mut h = harness(&cfg);
    h.scheduler.run_pass(t0()).await;
    let before = h.scheduler.state().slots.clone();

    // SEA goes down, so slot 0 should switch to NA2, but its update fails.
    h.players.set_error("SEA", FeedError::unavailable("HTTP 500"));
    h.chat.fail_edits(
        1000,
        vec![
            PublishError::Transient("HTTP 429".to_string()),
            PublishError::Transient("HTTP 502".to_string()),
            PublishError::Transient("HTTP 503".to_string()),
        ],
    );

    let summary = h.scheduler.run_pass(t0() + secs(60)).await;

    assert_eq!(h.chat.edit_attempts(1000), 1 + 3);
    assert_eq!(summary.publish_failures, 1);
    assert_eq!(summary.slots_updated, 4);

    let after = &h.scheduler.state().slots;
    assert_eq!(after.slots[0], before.slots[0], "failed slot keeps message id and binding");
    assert_eq!(after.slots[0].region.as_deref(), Some("SEA"));
    assert_eq!(after.slots[1].region.as_deref(), Some("NA1"));
    assert_eq!(after.slots[4].region.as_deref(), Some("SEA"));

    let sent = h.alerts.sent();
    assert_eq!(sent.len(), 1);
    let critical: Vec<&str> = sent[0].lines().filter(|l| l.starts_with("CRITICAL")).collect();
    assert_eq!(critical.len(), 1);
}

// ---------------------------------------------------------------------------
// 5-6. Directory cache
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn directory_fetched_once_per_ttl() {
    let cfg = config("");
    let mut h = harness(&cfg);

    let a = h.scheduler.run_pass(t0()).await;
    let b = h.scheduler.run_pass(t0() + secs(60)).await;
    assert_eq!(h.directory.calls(), 1);
    assert!(a.directory_refreshed);
    assert!(!b.directory_refreshed);
    assert_eq!(b.directory_members, 3);

    h.scheduler.run_pass(t0() + secs(300)).await;
    assert_eq!(h.directory.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_snapshot() {
    let cfg = config("");
    let mut h = harness(&cfg);
    h.scheduler.run_pass(t0()).await;

    h.directory.set_failing(Some("HTTP 503"));
    let summary = h.scheduler.run_pass(t0() + secs(300)).await;

    assert_eq!(summary.directory_members, 3);
    let sea = summary.regions.iter().find(|r| r.region == "SEA").unwrap();
    assert_eq!(sea.org_online, 2);

    let sent = h.alerts.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("directory refresh failed"));

    // Still stale: the next pass retries.
    h.directory.set_failing(None);
    let healed = h.scheduler.run_pass(t0() + secs(360)).await;
    assert!(healed.directory_refreshed);
    assert_eq!(h.directory.calls(), 3);
}

// ---------------------------------------------------------------------------
// 7. ConfigMissing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn no_regions_alerts_every_pass_and_publishes_nothing() {
    let cfg: MonitorConfig = load_layered_yaml_from_strings(&["alerts:\n  window_secs: 0\n"])
        .unwrap()
        .monitor()
        .unwrap();
    let mut h = harness(&cfg);

    for i in 0..2 {
        let summary = h.scheduler.run_pass(t0() + secs(60 * i)).await;
        assert!(!summary.regions_configured);
        assert!(summary.regions.is_empty());
    }

    let sent = h.alerts.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|s| s.contains("CONFIG_MISSING")));
    assert!(h.chat.created().is_empty());
    assert_eq!(h.players.calls(), 0);
    assert_eq!(h.queue.calls(), 0);
}

// ---------------------------------------------------------------------------
// 8. Failure threshold recovery
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn repeated_failures_re_resolve_the_endpoint() {
    let cfg = config("");
    let mut h = harness(&cfg);
    h.info.set_error("NA1", FeedError::Timeout {
        after: Duration::from_secs(3),
    });

    for i in 0..2 {
        h.scheduler.run_pass(t0() + secs(i)).await;
    }
    assert!(h.info.re_resolved().is_empty());

    h.scheduler.run_pass(t0() + secs(2)).await;
    assert_eq!(h.info.re_resolved(), vec!["NA1".to_string()]);

    for i in 3..6 {
        h.scheduler.run_pass(t0() + secs(i)).await;
    }
    assert_eq!(h.info.re_resolved().len(), 2);

    // Recovery resets the count.
    h.info.set_time("NA1", "Monday 05:59");
    let summary = h.scheduler.run_pass(t0() + secs(6)).await;
    let na1 = summary.regions.iter().find(|r| r.region == "NA1").unwrap();
    assert!(na1.online);
    assert_eq!(na1.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn failing_player_feed_does_not_re_resolve_server_info() {
    let cfg = config("");
    let mut h = harness(&cfg);
    h.players.set_error("NA1", FeedError::unavailable("HTTP 502"));

    let mut last = None;
    for i in 0..6 {
        last = Some(h.scheduler.run_pass(t0() + secs(i)).await);
    }

    let summary = last.unwrap();
    let na1 = summary.regions.iter().find(|r| r.region == "NA1").unwrap();
    assert!(!na1.online);
    assert_eq!(na1.consecutive_failures, 6);
    assert!(h.info.re_resolved().is_empty());
}

// ---------------------------------------------------------------------------
// 9. Loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn loop_runs_one_pass_per_interval_until_shutdown() {
    let cfg = config("");
    let mut h = harness(&cfg);
    let app = Arc::new(AppState::new("hash"));

    let shutdown = tokio::time::sleep(Duration::from_secs(150));
    h.scheduler
        .run_loop(Duration::from_secs(60), Arc::clone(&app), shutdown)
        .await;

    let st = app.status.read().await;
    assert_eq!(st.passes_completed, 3);
    assert_eq!(st.last_pass.as_ref().unwrap().slots.len(), 5);
    assert_eq!(h.chat.created().len(), 5);
}

// ---------------------------------------------------------------------------
// 10. Hung directory
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn hung_directory_refresh_does_not_stall_the_pass() {
    let cfg = config("feeds:\n  directory_timeout_ms: 2000\n");
    let mut h = harness(&cfg);
    h.directory.set_delay(Some(Duration::from_secs(24 * 3_600)));

    let summary = tokio::time::timeout(Duration::from_secs(3_600), h.scheduler.run_pass(t0()))
        .await
        .expect("pass stalled on the directory");

    assert!(!summary.directory_refreshed);
    assert_eq!(summary.directory_members, 0);
    assert_eq!(summary.slots_updated, 5);
    // Empty snapshot: only the tagged players are shown.
    let sea = summary.regions.iter().find(|r| r.region == "SEA").unwrap();
    assert_eq!(sea.shown_players, 2);

    let sent = h.alerts.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("directory refresh failed"));
    assert!(sent[0].contains("timed out"));

    h.directory.set_delay(None);
    let healed = h.scheduler.run_pass(t0() + secs(60)).await;
    assert!(healed.directory_refreshed);
    assert_eq!(healed.directory_members, 3);
    assert_eq!(h.directory.calls(), 2);
}
