//! Scenario: slot publisher state machine.
//!
//! # Invariants under test
//!
//! 1. An empty or wrong-sized table is replaced by N freshly created slots,
//!    which are updated in the same pass.
//! 2. A second pass with the same inputs creates nothing and updates every
//!    slot (idempotent binding).
//! 3. A slot whose update fails transiently 3 times produces exactly one
//!    alert and keeps its record (message id and region binding) unchanged;
//!    the other slots are still updated.
//! 4. A permanent failure is not retried, alerts once and never recreates.
//! 5. Slot i shows ordered[i]; bindings follow the order on success.
//! 6. A create failure aborts the pass, keeping the size mismatch for the
//!    next pass.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use rsm_alert::AlertBuffer;
use rsm_publish::{
    ChatPublisher, PublishError, RetryPolicy, SlotFailureKind, SlotPublisher, SlotRecord,
    SlotTable, StatusCard,
};

const CHANNEL: u64 = 777;

// ---------------------------------------------------------------------------
// Scripted chat
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedChat {
    next_id: Mutex<u64>,
    creates: Mutex<Vec<u64>>,
    /// (message_id, card title) for every successful edit
    edits: Mutex<Vec<(u64, String)>>,
    edit_attempts: Mutex<BTreeMap<u64, u32>>,
    /// Queued edit results per message id; empty queue means success.
    edit_script: Mutex<BTreeMap<u64, VecDeque<PublishError>>>,
    create_script: Mutex<VecDeque<Result<(), PublishError>>>,
}

impl ScriptedChat {
    fn new() -> Self {
        Self {
            next_id: Mutex::new(1000),
            ..Default::default()
        }
    }

    fn fail_edits(&self, message_id: u64, errors: Vec<PublishError>) {
        self.edit_script
            .lock()
            .unwrap()
            .insert(message_id, errors.into_iter().collect());
    }

    fn creates(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    fn edits(&self) -> Vec<(u64, String)> {
        self.edits.lock().unwrap().clone()
    }

    fn attempts(&self, message_id: u64) -> u32 {
        self.edit_attempts
            .lock()
            .unwrap()
            .get(&message_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ChatPublisher for ScriptedChat {
    async fn create_message(&self, channel_id: u64, _card: &StatusCard) -> Result<u64, PublishError> {
        assert_eq!(channel_id, CHANNEL);
        if let Some(Err(e)) = self.create_script.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        self.creates.lock().unwrap().push(*next);
        Ok(*next)
    }

    async fn edit_message(
        &self,
        _channel_id: u64,
        message_id: u64,
        card: &StatusCard,
    ) -> Result<(), PublishError> {
        *self
            .edit_attempts
            .lock()
            .unwrap()
            .entry(message_id)
            .or_insert(0) += 1;
        if let Some(queue) = self.edit_script.lock().unwrap().get_mut(&message_id) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }
        self.edits
            .lock()
            .unwrap()
            .push((message_id, card.title.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
}

fn regions(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn cards(names: &[&str]) -> BTreeMap<String, StatusCard> {
    names
        .iter()
        .map(|n| {
            let mut card = StatusCard::placeholder();
            card.title = format!("card {n}");
            (n.to_string(), card)
        })
        .collect()
}

fn bound_table(bindings: &[(&str, u64)]) -> SlotTable {
    SlotTable {
        slots: bindings
            .iter()
            .map(|(r, id)| SlotRecord {
                region: Some(r.to_string()),
                channel_id: CHANNEL,
                message_id: *id,
            })
            .collect(),
    }
}

fn publisher(chat: &ScriptedChat) -> SlotPublisher<'_> {
    SlotPublisher::new(
        chat,
        CHANNEL,
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        },
        Duration::from_secs(1),
    )
}

fn alerts() -> AlertBuffer {
    AlertBuffer::new(Duration::from_secs(300))
}

// ---------------------------------------------------------------------------
// 1 + 2. Initialization and idempotent binding
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn empty_table_initializes_then_updates_in_same_pass() {
    let chat = ScriptedChat::new();
    let order = regions(&["SEA", "NA1", "EU1"]);
    let mut buf = alerts();

    let report = publisher(&chat)
        .publish(&order, &cards(&["SEA", "NA1", "EU1"]), SlotTable::default(), &mut buf, now())
        .await;

    assert!(report.initialized);
    assert_eq!(report.created, 3);
    assert_eq!(report.updated, 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        report.table.bindings(),
        vec![Some("SEA".into()), Some("NA1".into()), Some("EU1".into())]
    );
    let ids: Vec<u64> = report.table.slots.iter().map(|s| s.message_id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003]);
    assert_eq!(buf.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_pass_only_updates() {
    let chat = ScriptedChat::new();
    let order = regions(&["SEA", "NA1"]);
    let c = cards(&["SEA", "NA1"]);
    let mut buf = alerts();
    let p = publisher(&chat);

    let first = p.publish(&order, &c, SlotTable::default(), &mut buf, now()).await;
    let second = p.publish(&order, &c, first.table.clone(), &mut buf, now()).await;

    assert_eq!(chat.creates(), 2, "no creates on the second pass");
    assert!(!second.initialized);
    assert_eq!(second.updated, 2);
    assert_eq!(second.table, first.table);
}

#[tokio::test(start_paused = true)]
async fn wrong_sized_table_is_recreated() {
    let chat = ScriptedChat::new();
    let order = regions(&["SEA", "NA1", "EU1"]);
    let stale = bound_table(&[("SEA", 1), ("NA1", 2)]);
    let mut buf = alerts();

    let report = publisher(&chat)
        .publish(&order, &cards(&["SEA", "NA1", "EU1"]), stale, &mut buf, now())
        .await;

    assert!(report.initialized);
    assert_eq!(chat.creates(), 3);
    assert!(report.table.slots.iter().all(|s| s.message_id > 1000));
}

// ---------------------------------------------------------------------------
// 3. Retry exhaustion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhausted_retries_alert_once_and_keep_record() {
    let chat = ScriptedChat::new();
    chat.fail_edits(
        11,
        vec![
            PublishError::Transient("429".into()),
            PublishError::Transient("429".into()),
            PublishError::Transient("429".into()),
        ],
    );
    let before = bound_table(&[("EU1", 10), ("NA1", 11), ("SEA", 12)]);
    let order = regions(&["SEA", "EU1", "NA1"]);
    let mut buf = alerts();

    let start = tokio::time::Instant::now();
    let report = publisher(&chat)
        .publish(&order, &cards(&["SEA", "EU1", "NA1"]), before.clone(), &mut buf, now())
        .await;

    assert_eq!(chat.attempts(11), 3);
    assert_eq!(buf.pending_len(), 1, "exactly one alert");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(
        report.failures[0].kind,
        SlotFailureKind::Exhausted { attempts: 3 }
    );
    assert_eq!(report.table.slots[1], before.slots[1], "record unchanged");

    // other slots still updated
    assert_eq!(report.updated, 2);
    assert_eq!(report.table.slots[0].region.as_deref(), Some("SEA"));
    assert_eq!(report.table.slots[2].region.as_deref(), Some("NA1"));

    // two backoffs + two inter-slot delays
    assert_eq!(start.elapsed(), Duration::from_secs(12));

    let text = buf.take_all().unwrap();
    assert!(text.starts_with("CRITICAL: "), "got: {text}");
}

#[tokio::test(start_paused = true)]
async fn transient_then_success_binds_normally() {
    let chat = ScriptedChat::new();
    chat.fail_edits(10, vec![PublishError::Transient("502".into())]);
    let mut buf = alerts();

    let report = publisher(&chat)
        .publish(
            &regions(&["EU1"]),
            &cards(&["EU1"]),
            bound_table(&[("NA1", 10)]),
            &mut buf,
            now(),
        )
        .await;

    assert_eq!(chat.attempts(10), 2);
    assert_eq!(report.table.slots[0].region.as_deref(), Some("EU1"));
    assert_eq!(buf.pending_len(), 0);
}

// ---------------------------------------------------------------------------
// 4. Permanent failure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_not_retried_or_recreated() {
    let chat = ScriptedChat::new();
    chat.fail_edits(10, vec![PublishError::Permanent("Unknown Message".into())]);
    let before = bound_table(&[("EU1", 10), ("NA1", 11)]);
    let mut buf = alerts();

    let report = publisher(&chat)
        .publish(&regions(&["NA1", "EU1"]), &cards(&["NA1", "EU1"]), before.clone(), &mut buf, now())
        .await;

    assert_eq!(chat.attempts(10), 1);
    assert_eq!(chat.creates(), 0);
    assert_eq!(report.failures[0].kind, SlotFailureKind::Permanent);
    assert_eq!(report.table.slots[0], before.slots[0]);
    assert_eq!(buf.pending_len(), 1);
    assert!(buf.take_all().unwrap().starts_with("ERROR: "));
}

// ---------------------------------------------------------------------------
// 5. Positional slots
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn slots_follow_presentation_order() {
    let chat = ScriptedChat::new();
    let mut buf = alerts();
    let table = bound_table(&[("SEA", 10), ("NA1", 11)]);

    // NA1 moved first this tick
    let report = publisher(&chat)
        .publish(&regions(&["NA1", "SEA"]), &cards(&["NA1", "SEA"]), table, &mut buf, now())
        .await;

    assert_eq!(
        chat.edits(),
        vec![(10, "card NA1".to_string()), (11, "card SEA".to_string())]
    );
    assert_eq!(
        report.table.bindings(),
        vec![Some("NA1".into()), Some("SEA".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_card_leaves_slot_untouched() {
    let chat = ScriptedChat::new();
    let mut buf = alerts();
    let table = bound_table(&[("SEA", 10), ("NA1", 11)]);

    let report = publisher(&chat)
        .publish(&regions(&["SEA", "NA1"]), &cards(&["SEA"]), table.clone(), &mut buf, now())
        .await;

    assert_eq!(chat.attempts(11), 0);
    assert_eq!(report.table.slots[1], table.slots[1]);
    assert_eq!(report.failures[0].kind, SlotFailureKind::MissingContent);
}

// ---------------------------------------------------------------------------
// 6. Create failure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn create_failure_aborts_pass() {
    let chat = ScriptedChat::new();
    {
        let mut script = chat.create_script.lock().unwrap();
        script.push_back(Ok(()));
        script.push_back(Err(PublishError::Permanent("Missing Access".into())));
    }
    let mut buf = alerts();

    let report = publisher(&chat)
        .publish(&regions(&["SEA", "NA1", "EU1"]), &cards(&["SEA", "NA1", "EU1"]), SlotTable::default(), &mut buf, now())
        .await;

    assert_eq!(report.table.len(), 1, "size mismatch kept for next pass");
    assert_eq!(report.updated, 0);
    assert_eq!(chat.attempts(1001), 0);
    assert_eq!(buf.pending_len(), 1);
}
