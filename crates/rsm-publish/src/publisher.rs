//! Slot publisher: projects this tick's ordered cards onto the slot table.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use rsm_alert::{AlertBuffer, AlertLevel};

use crate::render::StatusCard;
use crate::retry::{with_retry, RetryError, RetryPolicy};
use crate::slots::{SlotRecord, SlotTable};

// ---------------------------------------------------------------------------
// Chat seam
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishError {
    /// Worth retrying: rate limits, 5xx, transport errors.
    Transient(String),
    /// Retrying cannot help: message deleted, missing access, bad request.
    Permanent(String),
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Transient(msg) => write!(f, "transient publish error: {msg}"),
            PublishError::Permanent(msg) => write!(f, "permanent publish error: {msg}"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Message create/edit on the chat platform.
#[async_trait::async_trait]
pub trait ChatPublisher: Send + Sync {
    /// Post a new message; returns its id.
    async fn create_message(&self, channel_id: u64, card: &StatusCard) -> Result<u64, PublishError>;

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        card: &StatusCard,
    ) -> Result<(), PublishError>;
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotFailureKind {
    Exhausted { attempts: u32 },
    Permanent,
    /// No card was rendered for the region assigned to the slot.
    MissingContent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotFailure {
    pub index: usize,
    pub region: Option<String>,
    pub kind: SlotFailureKind,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Table to persist.
    pub table: SlotTable,
    pub initialized: bool,
    pub created: usize,
    pub updated: usize,
    pub failures: Vec<SlotFailure>,
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

pub struct SlotPublisher<'a> {
    chat: &'a dyn ChatPublisher,
    channel_id: u64,
    retry: RetryPolicy,
    inter_slot_delay: Duration,
}

impl<'a> SlotPublisher<'a> {
    pub fn new(
        chat: &'a dyn ChatPublisher,
        channel_id: u64,
        retry: RetryPolicy,
        inter_slot_delay: Duration,
    ) -> Self {
        Self {
            chat,
            channel_id,
            retry,
            inter_slot_delay,
        }
    }

    /// One publish pass.
    ///
    /// `ordered` is this tick's presentation order (its length is the slot
    /// count) and `cards` holds the rendered card per region. When `table`
    /// does not have exactly one record per region, N new placeholder
    /// messages are created first and the updates run against them in the
    /// same pass. Failures are logged and pushed to `alerts`; the returned
    /// table is the one to persist.
    pub async fn publish(
        &self,
        ordered: &[String],
        cards: &BTreeMap<String, StatusCard>,
        table: SlotTable,
        alerts: &mut AlertBuffer,
        now: DateTime<Utc>,
    ) -> PublishReport {
        let mut report = PublishReport {
            table,
            ..Default::default()
        };
        let n = ordered.len();

        if report.table.len() != n {
            info!(
                persisted = report.table.len(),
                expected = n,
                "slot table size mismatch; creating new slots"
            );
            report.initialized = true;
            match self.initialize(n, alerts, now).await {
                Ok(table) => {
                    report.created = table.len();
                    report.table = table;
                }
                Err((partial, failure)) => {
                    // Leave the size mismatch in place so the next pass
                    // initializes again.
                    report.created = partial.len();
                    report.table = partial;
                    report.failures.push(failure);
                    return report;
                }
            }
        }

        for (index, region) in ordered.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_slot_delay).await;
            }
            let Some(card) = cards.get(region) else {
                warn!(slot = index, region = %region, "no card rendered for region; slot left as is");
                report.failures.push(SlotFailure {
                    index,
                    region: Some(region.clone()),
                    kind: SlotFailureKind::MissingContent,
                    error: "no card rendered".to_string(),
                });
                continue;
            };
            let Some(record) = report.table.slots.get_mut(index) else {
                continue;
            };

            let res = with_retry(self.retry, PublishError::is_transient, || {
                self.chat
                    .edit_message(record.channel_id, record.message_id, card)
            })
            .await;

            match res {
                Ok(()) => {
                    record.region = Some(region.clone());
                    report.updated += 1;
                }
                Err(err) => {
                    let failure = self.on_failure(index, Some(region), "update", record, err, alerts, now);
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Create `n` placeholder messages. On the first failure the records
    /// created so far are returned with the failure.
    async fn initialize(
        &self,
        n: usize,
        alerts: &mut AlertBuffer,
        now: DateTime<Utc>,
    ) -> Result<SlotTable, (SlotTable, SlotFailure)> {
        let placeholder = StatusCard::placeholder();
        let mut table = SlotTable::default();

        for index in 0..n {
            if index > 0 {
                tokio::time::sleep(self.inter_slot_delay).await;
            }
            let res = with_retry(self.retry, PublishError::is_transient, || {
                self.chat.create_message(self.channel_id, &placeholder)
            })
            .await;

            match res {
                Ok(message_id) => table.slots.push(SlotRecord {
                    region: None,
                    channel_id: self.channel_id,
                    message_id,
                }),
                Err(err) => {
                    let pending = SlotRecord {
                        region: None,
                        channel_id: self.channel_id,
                        message_id: 0,
                    };
                    let failure = self.on_failure(index, None, "create", &pending, err, alerts, now);
                    return Err((table, failure));
                }
            }
        }

        info!(slots = n, channel_id = self.channel_id, "slots created");
        Ok(table)
    }

    #[allow(clippy::too_many_arguments)]
    fn on_failure(
        &self,
        index: usize,
        region: Option<&String>,
        op: &str,
        record: &SlotRecord,
        err: RetryError<PublishError>,
        alerts: &mut AlertBuffer,
        now: DateTime<Utc>,
    ) -> SlotFailure {
        let region_label = region.map(String::as_str).unwrap_or("-");
        let (kind, level) = match &err {
            RetryError::Exhausted { attempts, .. } => {
                error!(
                    severity = "critical",
                    slot = index,
                    region = region_label,
                    message_id = record.message_id,
                    error = %err,
                    "slot {op} failed after retries"
                );
                (
                    SlotFailureKind::Exhausted {
                        attempts: *attempts,
                    },
                    AlertLevel::Critical,
                )
            }
            RetryError::Permanent { .. } => {
                error!(
                    slot = index,
                    region = region_label,
                    message_id = record.message_id,
                    error = %err,
                    "slot {op} failed permanently; slot left stale"
                );
                (SlotFailureKind::Permanent, AlertLevel::Error)
            }
        };

        alerts.push(
            level,
            format!("slot {index} ({region_label}) {op} failed: {err}"),
            now,
        );

        SlotFailure {
            index,
            region: region.cloned(),
            kind,
            error: err.error().to_string(),
        }
    }
}
