//! Shared runtime state for rsm-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The scheduler writes
//! the latest pass summary here after every pass; nothing else mutates it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::api_types::PassSummary;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of daemon state, returned by GET /v1/status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    /// SHA-256 of the canonical merged configuration.
    pub config_hash: String,
    pub passes_completed: u64,
    pub last_pass: Option<PassSummary>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub status: Arc<RwLock<StatusSnapshot>>,
}

impl AppState {
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            build: BuildInfo {
                service: "rsm-daemon".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            status: Arc::new(RwLock::new(StatusSnapshot {
                daemon_uptime_secs: uptime_secs(),
                config_hash: config_hash.into(),
                passes_completed: 0,
                last_pass: None,
            })),
        }
    }

    pub async fn record_pass(&self, summary: PassSummary) {
        let mut st = self.status.write().await;
        st.passes_completed += 1;
        st.last_pass = Some(summary);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
