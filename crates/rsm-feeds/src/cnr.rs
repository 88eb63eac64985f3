//! GTA CnR public API: `/cnr/players?serverId=<id>` and `/cnr/servers`.
//!
//! The API names servers by its own ids (`US1`, `US2`, `EU1`, ...). Regions
//! are configured with a display name plus an optional API id; this client
//! translates both ways so callers only ever see region names.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use rsm_schemas::{FeedError, FeedResult, QueueEntry, QueueSnapshot, RawPlayerRecord};

use crate::provider::{PlayerFeed, QueueFeed};
use crate::transport_error;

#[derive(Debug, Clone)]
pub struct CnrApiClient {
    http: reqwest::Client,
    players_url: String,
    servers_url: String,
    /// region name -> API server id
    server_ids: BTreeMap<String, String>,
}

impl CnrApiClient {
    /// `regions` is `(region name, API server id)` in any order.
    pub fn new<I>(http: reqwest::Client, players_url: String, servers_url: String, regions: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            http,
            players_url,
            servers_url,
            server_ids: regions.into_iter().collect(),
        }
    }

    fn region_for_server_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.server_ids
            .iter()
            .find(|(_, sid)| sid.as_str() == id)
            .map(|(region, _)| region.as_str())
            .unwrap_or(id)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> FeedResult<T> {
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::unavailable(format!("HTTP {}", status.as_u16())));
        }
        resp.json::<T>().await.map_err(transport_error)
    }
}

#[async_trait::async_trait]
impl PlayerFeed for CnrApiClient {
    async fn fetch_players(&self, region: &str) -> FeedResult<Vec<RawPlayerRecord>> {
        let Some(server_id) = self.server_ids.get(region) else {
            return Err(FeedError::unavailable(format!(
                "no server id configured for region {region}"
            )));
        };

        let req = self
            .http
            .get(&self.players_url)
            .query(&[("serverId", server_id.as_str())]);
        let wire: Vec<WirePlayer> = self.get_json(req).await?;

        debug!(region, players = wire.len(), "players fetched");
        Ok(wire
            .into_iter()
            .map(|p| RawPlayerRecord::new(p.username.username))
            .collect())
    }
}

#[async_trait::async_trait]
impl QueueFeed for CnrApiClient {
    async fn fetch_queue(&self) -> FeedResult<QueueSnapshot> {
        let wire: Vec<WireServer> = self.get_json(self.http.get(&self.servers_url)).await?;

        let mut snap = QueueSnapshot::empty();
        for s in wire {
            let region = self.region_for_server_id(&s.id).to_string();
            snap.insert(
                region,
                QueueEntry {
                    players: s.players,
                    max_players: s.max_players,
                    queued_players: s.queued_players,
                    last_heartbeat: s.last_heartbeat.as_deref().and_then(parse_heartbeat),
                },
            );
        }
        Ok(snap)
    }
}

/// Parse an upstream heartbeat timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`, `...+00:00`) and offset-less
/// ISO timestamps, which are taken as UTC. Returns `None` otherwise.
pub fn parse_heartbeat(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WirePlayer {
    #[serde(rename = "Username")]
    username: WireUsername,
}

#[derive(Debug, Deserialize)]
struct WireUsername {
    #[serde(rename = "Username")]
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireServer {
    id: String,
    #[serde(default)]
    players: u32,
    #[serde(default)]
    max_players: u32,
    #[serde(default)]
    queued_players: u32,
    #[serde(default, rename = "LastHeartbeatDateTime")]
    last_heartbeat: Option<String>,
}
