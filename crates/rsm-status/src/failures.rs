//! Consecutive failure tracking per region and per feed.
//!
//! Two views are kept. The region count goes up on every tick whose verdict
//! is a feed failure (`FeedUnavailable` / `FeedTimeout`) and drops to zero on
//! any other verdict; it is what operators see. Feed counts are kept per
//! `(region, FeedKind)` and reset on that feed's first good fetch. Each time
//! a feed count reaches a multiple of the threshold the caller is told to run
//! that feed's recovery action, so a feed that stays down is retried every
//! `threshold` ticks rather than once.

use std::collections::BTreeMap;

use crate::types::RegionVerdict;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedKind {
    Players,
    ServerInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureAction {
    None,
    Recover { consecutive: u32 },
}

#[derive(Clone, Debug, Default)]
pub struct FailureCounter {
    /// `0` disables recovery.
    threshold: u32,
    counts: BTreeMap<String, u32>,
    feeds: BTreeMap<(String, FeedKind), u32>,
}

impl FailureCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            counts: BTreeMap::new(),
            feeds: BTreeMap::new(),
        }
    }

    /// Update the region count from this tick's verdict; returns the new count.
    pub fn record(&mut self, verdict: &RegionVerdict) -> u32 {
        if !verdict.reason.is_feed_failure() {
            self.counts.remove(&verdict.region);
            return 0;
        }
        let count = self.counts.entry(verdict.region.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Update one feed's count for `region`.
    pub fn record_feed(&mut self, region: &str, kind: FeedKind, failed: bool) -> FailureAction {
        let key = (region.to_string(), kind);
        if !failed {
            self.feeds.remove(&key);
            return FailureAction::None;
        }

        let count = self.feeds.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        if self.threshold > 0 && *count % self.threshold == 0 {
            FailureAction::Recover {
                consecutive: *count,
            }
        } else {
            FailureAction::None
        }
    }

    pub fn count(&self, region: &str) -> u32 {
        self.counts.get(region).copied().unwrap_or(0)
    }

    pub fn feed_count(&self, region: &str, kind: FeedKind) -> u32 {
        self.feeds
            .get(&(region.to_string(), kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counts.clone()
    }
}
