//! Player list read from a local JSON file, for running without the API.
//!
//! The file uses the same shape as the players API
//! (`[{"Username": {"Username": "..."}}]`) and is returned for every region.

use std::path::PathBuf;

use serde::Deserialize;

use rsm_schemas::{FeedError, FeedResult, RawPlayerRecord};

use crate::provider::PlayerFeed;

#[derive(Debug, Clone)]
pub struct LocalJsonPlayerFeed {
    path: PathBuf,
}

impl LocalJsonPlayerFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
struct Entry {
    #[serde(rename = "Username")]
    username: Inner,
}

#[derive(Deserialize)]
struct Inner {
    #[serde(rename = "Username")]
    username: String,
}

#[async_trait::async_trait]
impl PlayerFeed for LocalJsonPlayerFeed {
    async fn fetch_players(&self, _region: &str) -> FeedResult<Vec<RawPlayerRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FeedError::unavailable(format!("read {}: {e}", self.path.display()))
        })?;
        let entries: Vec<Entry> = serde_json::from_str(&raw).map_err(|e| {
            FeedError::unavailable(format!("parse {}: {e}", self.path.display()))
        })?;
        Ok(entries
            .into_iter()
            .map(|e| RawPlayerRecord::new(e.username.username))
            .collect())
    }
}
