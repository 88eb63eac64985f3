//! Reconciliation pass and the timed loop around it.
//!
//! A pass:
//! 1. refreshes the directory (TTL-bounded) and fetches the queue feed plus
//!    every region's players and server info, all concurrently and each
//!    under its own timeout (the directory refresh included)
//! 2. builds a roster and a verdict per region from that one directory
//!    snapshot
//! 3. updates failure counters and re-resolves the server-info endpoint of
//!    regions whose server-info fetch keeps failing
//! 4. orders the regions, renders the cards and publishes them onto the
//!    slot table, which is then persisted
//! 5. flushes the alert buffer when its window has elapsed
//!
//! Feed and directory failures never abort a pass. Cross-tick state lives in
//! [`MonitorState`], owned by the [`Scheduler`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use rsm_alert::{AlertBuffer, AlertLevel, AlertSink};
use rsm_config::{ConfigMissing, MonitorConfig};
use rsm_feeds::{with_timeout, PlayerFeed, QueueFeed, ServerInfoFeed};
use rsm_publish::{
    render_card, CardStyle, ChatPublisher, EmojiSet, RetryPolicy, SlotPublisher, SlotStore,
    SlotTable, StatusCard,
};
use rsm_roster::{
    build_roster, DirectoryCache, DirectoryError, DirectorySource, EnsureFresh, RankTable,
    RefreshOutcome, RegionRoster, RoleId, RolePrecedence, TagPatterns,
};
use rsm_schemas::RawPlayerRecord;
use rsm_status::{
    evaluate, order_regions, restart_countdown, FailureAction, FailureCounter, FeedKind,
    LivenessPolicy, RegionReport, RestartPolicy,
};

use crate::api_types::{PassSummary, RegionSummary};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Every external seam a pass talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub players: Arc<dyn PlayerFeed>,
    pub queue: Arc<dyn QueueFeed>,
    pub info: Arc<dyn ServerInfoFeed>,
    pub directory: Arc<dyn DirectorySource>,
    pub chat: Arc<dyn ChatPublisher>,
    pub alerts: Arc<dyn AlertSink>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedTimeouts {
    pub players: Duration,
    pub queue: Duration,
    pub server_info: Duration,
    pub directory: Duration,
}

/// Immutable per-pass parameters derived from [`MonitorConfig`].
#[derive(Clone, Debug)]
pub struct PassSettings {
    /// Configured regions, in configuration order.
    pub regions: Vec<String>,
    pub preferred_order: Vec<String>,
    pub flags: BTreeMap<String, String>,
    pub timeouts: FeedTimeouts,
    pub liveness: LivenessPolicy,
    pub precedence: RolePrecedence,
    pub ranks: RankTable,
    pub restart: RestartPolicy,
    pub channel_id: u64,
    pub retry: RetryPolicy,
    pub inter_slot_delay: Duration,
    pub emojis: EmojiSet,
    pub style: CardStyle,
}

impl PassSettings {
    pub fn from_config(cfg: &MonitorConfig, emojis: EmojiSet) -> Self {
        let roles = &cfg.directory.roles;
        Self {
            regions: cfg.region_names(),
            preferred_order: cfg.preferred_order(),
            flags: cfg
                .regions
                .iter()
                .filter_map(|r| r.flag.clone().map(|f| (r.name.clone(), f)))
                .collect(),
            timeouts: FeedTimeouts {
                players: cfg.feeds.players_timeout(),
                queue: cfg.feeds.queue_timeout(),
                server_info: cfg.feeds.server_info_timeout(),
                directory: cfg.feeds.directory_timeout(),
            },
            liveness: LivenessPolicy {
                stale_after: cfg.schedule.stale_heartbeat(),
            },
            precedence: RolePrecedence {
                leadership: roles.leadership.map(RoleId),
                cadet: roles.cadet.map(RoleId),
                trainee: roles.trainee.map(RoleId),
                member: roles.member.map(RoleId),
            },
            ranks: RankTable::new(
                cfg.directory
                    .ranks
                    .iter()
                    .map(|r| (r.label.clone(), RoleId(r.role))),
            ),
            restart: RestartPolicy {
                ratio: cfg.presentation.restart_ratio,
            },
            channel_id: cfg.publish.channel_id,
            retry: RetryPolicy {
                max_attempts: cfg.publish.max_attempts,
                backoff: cfg.publish.backoff(),
            },
            inter_slot_delay: cfg.publish.inter_slot_delay(),
            emojis,
            style: CardStyle {
                org_tag: cfg.directory.org_tag.clone(),
                refresh_secs: cfg.schedule.tick_interval_secs,
                ..CardStyle::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-tick state
// ---------------------------------------------------------------------------

/// State carried from one pass to the next.
#[derive(Debug)]
pub struct MonitorState {
    pub directory: DirectoryCache,
    pub slots: SlotTable,
    pub failures: FailureCounter,
    pub alerts: AlertBuffer,
}

impl MonitorState {
    pub fn new(cfg: &MonitorConfig, slots: SlotTable) -> Self {
        let patterns = TagPatterns::new(&cfg.directory.org_tag, &cfg.directory.suffix_tags);
        Self {
            directory: DirectoryCache::new(cfg.schedule.directory_ttl(), patterns),
            slots,
            failures: FailureCounter::new(cfg.schedule.failure_threshold),
            alerts: AlertBuffer::new(cfg.alerts.window()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler {
    settings: PassSettings,
    collab: Collaborators,
    state: MonitorState,
    store: SlotStore,
}

impl Scheduler {
    pub fn new(
        settings: PassSettings,
        collab: Collaborators,
        state: MonitorState,
        store: SlotStore,
    ) -> Self {
        Self {
            settings,
            collab,
            state,
            store,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// One full reconciliation pass at wall-clock `now`.
    pub async fn run_pass(&mut self, now: DateTime<Utc>) -> PassSummary {
        let started = Instant::now();
        let pass_id = Uuid::new_v4();

        let Scheduler {
            settings,
            collab,
            state,
            store,
        } = self;

        let mut summary = PassSummary {
            pass_id,
            started_at: now,
            duration_ms: 0,
            regions_configured: true,
            directory_members: 0,
            directory_refreshed: false,
            regions: Vec::new(),
            slots: state.slots.bindings(),
            slots_created: 0,
            slots_updated: 0,
            publish_failures: 0,
        };

        if settings.regions.is_empty() {
            let missing = ConfigMissing { what: "regions" };
            error!(%pass_id, error = %missing, "pass skipped");
            state.alerts.push(AlertLevel::Error, missing.to_string(), now);
            summary.regions_configured = false;
            flush_due(state, collab.alerts.as_ref(), now).await;
            summary.duration_ms = elapsed_ms(started);
            return summary;
        }

        // ---- 1. concurrent fetches -----------------------------------------

        let t = settings.timeouts;
        let directory_fut = tokio::time::timeout(
            t.directory,
            state.directory.ensure_fresh(collab.directory.as_ref(), now),
        );
        let queue_fut = with_timeout(t.queue, collab.queue.fetch_queue());
        let players_fut = join_all(
            settings
                .regions
                .iter()
                .map(|r| with_timeout(t.players, collab.players.fetch_players(r))),
        );
        let info_fut = join_all(
            settings
                .regions
                .iter()
                .map(|r| with_timeout(t.server_info, collab.info.fetch_info(r))),
        );

        let (directory, queue, players, infos) =
            tokio::join!(directory_fut, queue_fut, players_fut, info_fut);

        // An abandoned refresh never touched the cache, so it is still stale
        // and the next pass tries again.
        let directory = directory.unwrap_or_else(|_| {
            let err = DirectoryError::Unavailable(format!("timed out after {:?}", t.directory));
            error!(%pass_id, error = %err, "directory refresh failed");
            EnsureFresh {
                snapshot: state.directory.snapshot(),
                outcome: RefreshOutcome::Failed(err),
            }
        });

        summary.directory_members = directory.snapshot.len();
        match &directory.outcome {
            RefreshOutcome::Cached => {}
            RefreshOutcome::Refreshed { .. } => summary.directory_refreshed = true,
            RefreshOutcome::Failed(err) => {
                state
                    .alerts
                    .push(AlertLevel::Error, format!("directory refresh failed: {err}"), now);
            }
        }
        if let Err(err) = &queue {
            warn!(%pass_id, feed = "queue", error = %err, "feed fetch failed");
            state
                .alerts
                .push(AlertLevel::Error, format!("queue feed failed: {err}"), now);
        }

        // ---- 2. rosters and verdicts ---------------------------------------

        let mut reports: BTreeMap<String, RegionReport> = BTreeMap::new();
        let mut verdicts = Vec::with_capacity(settings.regions.len());
        let mut recover: Vec<(String, u32)> = Vec::new();

        for ((region, players), info) in settings.regions.iter().zip(players).zip(infos) {
            if let Err(err) = &players {
                warn!(%pass_id, region = %region, feed = "players", error = %err, "feed fetch failed");
            }
            if let Err(err) = &info {
                warn!(%pass_id, region = %region, feed = "server_info", error = %err, "feed fetch failed");
            }

            let verdict = evaluate(region, &players, &queue, &info, now, &settings.liveness);
            if !verdict.online {
                info!(%pass_id, region = %region, reason = %verdict.reason, "region offline");
            }

            let roster = if verdict.online {
                let raw: &[RawPlayerRecord] = players.as_deref().unwrap_or(&[]);
                build_roster(
                    region,
                    raw,
                    &directory.snapshot,
                    &settings.precedence,
                    &settings.ranks,
                )
            } else {
                RegionRoster {
                    region: region.clone(),
                    players: Vec::new(),
                }
            };

            state.failures.record(&verdict);
            state
                .failures
                .record_feed(region, FeedKind::Players, players.is_err());
            // Only the server-info endpoint can be re-resolved.
            if let FailureAction::Recover { consecutive } =
                state
                    .failures
                    .record_feed(region, FeedKind::ServerInfo, info.is_err())
            {
                recover.push((region.clone(), consecutive));
            }

            let restart = info
                .as_ref()
                .ok()
                .and_then(|i| i.time.as_deref())
                .and_then(|time| restart_countdown(time, settings.restart));

            reports.insert(
                region.clone(),
                RegionReport {
                    queue: queue.as_ref().ok().and_then(|q| q.get(region)).cloned(),
                    restart,
                    roster,
                    verdict: verdict.clone(),
                },
            );
            verdicts.push(verdict);
        }

        // ---- 3. endpoint recovery ------------------------------------------

        for (region, consecutive) in recover {
            warn!(%pass_id, region = %region, consecutive, "repeated server-info failures; re-resolving endpoint");
            match with_timeout(t.server_info, collab.info.re_resolve(&region)).await {
                Ok(Some(endpoint)) => {
                    info!(%pass_id, region = %region, endpoint = %endpoint, "endpoint re-resolved")
                }
                Ok(None) => {}
                Err(err) => {
                    error!(%pass_id, region = %region, error = %err, "endpoint re-resolution failed");
                    state.alerts.push(
                        AlertLevel::Error,
                        format!("{region}: endpoint re-resolution failed after {consecutive} failed passes: {err}"),
                        now,
                    );
                }
            }
        }

        // ---- 4. order, render, publish, persist ----------------------------

        let ordered = order_regions(&verdicts, &settings.preferred_order);
        let cards: BTreeMap<String, StatusCard> = reports
            .iter()
            .map(|(region, report)| {
                let flag = settings.flags.get(region).map(String::as_str);
                let card = render_card(report, flag, &settings.emojis, &settings.style, now);
                (region.clone(), card)
            })
            .collect();

        let publisher = SlotPublisher::new(
            collab.chat.as_ref(),
            settings.channel_id,
            settings.retry,
            settings.inter_slot_delay,
        );
        let table = std::mem::take(&mut state.slots);
        let report = publisher
            .publish(&ordered, &cards, table, &mut state.alerts, now)
            .await;
        state.slots = report.table;

        if let Err(err) = store.save(&state.slots) {
            let detail = format!("{err:#}");
            error!(%pass_id, error = %detail, path = %store.path().display(), "slot table not persisted");
            state
                .alerts
                .push(AlertLevel::Error, format!("slot table not persisted: {detail}"), now);
        }

        // ---- 5. summary + alerts -------------------------------------------

        summary.regions = ordered
            .iter()
            .filter_map(|region| reports.get(region))
            .map(|r| RegionSummary {
                region: r.region().to_string(),
                online: r.verdict.online,
                reason: r.verdict.reason.as_str().to_string(),
                org_online: r.roster.org_online(),
                shown_players: r.roster.players.len(),
                consecutive_failures: state.failures.count(r.region()),
            })
            .collect();
        summary.slots = state.slots.bindings();
        summary.slots_created = report.created;
        summary.slots_updated = report.updated;
        summary.publish_failures = report.failures.len();

        flush_due(state, collab.alerts.as_ref(), now).await;

        summary.duration_ms = elapsed_ms(started);
        info!(
            %pass_id,
            duration_ms = summary.duration_ms,
            online = verdicts.iter().filter(|v| v.online).count(),
            regions = verdicts.len(),
            updated = summary.slots_updated,
            failures = summary.publish_failures,
            "pass complete"
        );
        summary
    }

    /// Run passes every `interval` until `shutdown` resolves.
    ///
    /// A pass always runs to completion; shutdown is only observed between
    /// passes. Pending alerts are flushed before returning.
    pub async fn run_loop<S>(&mut self, interval: Duration, app: Arc<AppState>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; stopping between passes");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let summary = self.run_pass(Utc::now()).await;
            let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
            if summary.duration_ms > interval_ms {
                warn!(
                    duration_ms = summary.duration_ms,
                    interval_ms, "pass overran the tick interval"
                );
            }
            app.record_pass(summary).await;
        }

        self.flush_all().await;
    }

    /// Send everything still buffered, window or not.
    pub async fn flush_all(&mut self) {
        if let Some(text) = self.state.alerts.take_all() {
            deliver(self.collab.alerts.as_ref(), &text).await;
        }
    }
}

async fn flush_due(state: &mut MonitorState, sink: &dyn AlertSink, now: DateTime<Utc>) {
    if let Some(text) = state.alerts.take_due(now) {
        deliver(sink, &text).await;
    }
}

async fn deliver(sink: &dyn AlertSink, text: &str) {
    if let Err(err) = sink.notify(text).await {
        error!(error = %err, "alert delivery failed; batch dropped");
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
