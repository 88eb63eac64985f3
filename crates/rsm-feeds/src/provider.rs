//! Feed traits and the shared timeout bound.
//!
//! Implementations must be object-safe and `Send + Sync`: the scheduler
//! holds them as `Arc<dyn ...>` and calls them from concurrent futures.

use std::future::Future;
use std::time::Duration;

use rsm_schemas::{FeedError, FeedResult, QueueSnapshot, RawPlayerRecord, ServerInfo};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Live player list for one region.
#[async_trait::async_trait]
pub trait PlayerFeed: Send + Sync {
    async fn fetch_players(&self, region: &str) -> FeedResult<Vec<RawPlayerRecord>>;
}

/// Population, queue and heartbeat for every region in one call.
#[async_trait::async_trait]
pub trait QueueFeed: Send + Sync {
    async fn fetch_queue(&self) -> FeedResult<QueueSnapshot>;
}

/// Per-region server info (in-simulation clock).
#[async_trait::async_trait]
pub trait ServerInfoFeed: Send + Sync {
    async fn fetch_info(&self, region: &str) -> FeedResult<ServerInfo>;

    /// Look up the region's current endpoint again after repeated failures.
    ///
    /// Returns the new endpoint when it changed. The default has nothing to
    /// re-resolve.
    async fn re_resolve(&self, region: &str) -> FeedResult<Option<String>> {
        let _ = region;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Timeout
// ---------------------------------------------------------------------------

/// Bound a fetch; an elapsed timer becomes [`FeedError::Timeout`].
pub async fn with_timeout<T, F>(after: Duration, fetch: F) -> FeedResult<T>
where
    F: Future<Output = FeedResult<T>>,
{
    match tokio::time::timeout(after, fetch).await {
        Ok(res) => res,
        Err(_) => Err(FeedError::Timeout { after }),
    }
}
