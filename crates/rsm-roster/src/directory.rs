//! TTL-bounded directory snapshot.
//!
//! # Contract
//! - `ensure_fresh(source, now)` refreshes when the cache was never filled or
//!   `now - fetched_at >= ttl`, otherwise returns the cached snapshot without
//!   touching the source.
//! - A refresh is a single `list_members` call. On failure the previous
//!   snapshot (possibly empty) stays in place and `fetched_at` is unchanged,
//!   so the next call tries again.
//! - The snapshot is handed out as an `Arc`; a pass that captured it keeps a
//!   consistent view even if the cache is refreshed later.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::normalize::TagPatterns;
use crate::types::{DirectoryMember, DirectorySnapshot};

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be listed (transport, auth, status, decode).
    Unavailable(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Unavailable(msg) => write!(f, "directory unavailable: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Lists every member of the organizational directory with their roles.
#[async_trait::async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list_members(&self) -> Result<Vec<DirectoryMember>, DirectoryError>;
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot was within TTL; no fetch.
    Cached,
    Refreshed { members: usize },
    /// Fetch failed; the previous snapshot is returned.
    Failed(DirectoryError),
}

#[derive(Clone, Debug)]
pub struct EnsureFresh {
    pub snapshot: Arc<DirectorySnapshot>,
    pub outcome: RefreshOutcome,
}

#[derive(Debug)]
pub struct DirectoryCache {
    ttl: Duration,
    patterns: TagPatterns,
    snapshot: Arc<DirectorySnapshot>,
    fetched_at: Option<DateTime<Utc>>,
}

impl DirectoryCache {
    /// Empty cache; the first `ensure_fresh` always fetches.
    pub fn new(ttl: Duration, patterns: TagPatterns) -> Self {
        Self {
            ttl,
            snapshot: Arc::new(DirectorySnapshot::empty(patterns.clone())),
            patterns,
            fetched_at: None,
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// `true` when the next `ensure_fresh(now)` would fetch.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let Some(fetched_at) = self.fetched_at else {
            return true;
        };
        // A negative age (clock stepped back) also forces a refresh.
        match now.signed_duration_since(fetched_at).to_std() {
            Ok(age) => age >= self.ttl,
            Err(_) => true,
        }
    }

    pub async fn ensure_fresh(
        &mut self,
        source: &dyn DirectorySource,
        now: DateTime<Utc>,
    ) -> EnsureFresh {
        if !self.is_stale(now) {
            return EnsureFresh {
                snapshot: self.snapshot(),
                outcome: RefreshOutcome::Cached,
            };
        }

        match source.list_members().await {
            Ok(members) => {
                let count = members.len();
                self.snapshot = Arc::new(DirectorySnapshot::new(members, self.patterns.clone()));
                self.fetched_at = Some(now);
                info!(members = count, "directory refreshed");
                EnsureFresh {
                    snapshot: self.snapshot(),
                    outcome: RefreshOutcome::Refreshed { members: count },
                }
            }
            Err(err) => {
                error!(error = %err, kept_members = self.snapshot.len(), "directory refresh failed");
                EnsureFresh {
                    snapshot: self.snapshot(),
                    outcome: RefreshOutcome::Failed(err),
                }
            }
        }
    }
}
