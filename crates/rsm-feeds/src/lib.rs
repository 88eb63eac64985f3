//! rsm-feeds
//!
//! Upstream data feeds: the live player list, the global queue/heartbeat
//! list, and per-region server info.
//!
//! This crate owns the feed traits and the concrete HTTP clients. Every
//! client maps its wire payload into `rsm-schemas` types and every failure
//! into [`FeedError`]; nothing here decides liveness.

mod cnr;
mod fivem;
mod local;
mod provider;

pub use cnr::{parse_heartbeat, CnrApiClient};
pub use fivem::FivemInfoClient;
pub use local::LocalJsonPlayerFeed;
pub use provider::{with_timeout, PlayerFeed, QueueFeed, ServerInfoFeed};

pub use rsm_schemas::{FeedError, FeedResult};

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!("rsm-daemon/", env!("CARGO_PKG_VERSION"));

pub(crate) fn transport_error(err: reqwest::Error) -> FeedError {
    if err.is_decode() {
        FeedError::unavailable(format!("decode error: {err}"))
    } else {
        FeedError::unavailable(format!("transport error: {err}"))
    }
}
