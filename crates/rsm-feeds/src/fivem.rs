//! FiveM `info.json` per region, plus endpoint re-resolution through the
//! public server list.
//!
//! Game servers serve `info.json` over HTTPS with self-signed certificates,
//! so the client built by [`FivemInfoClient::build_http`] skips certificate
//! verification. It is only ever used for these read-only endpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use rsm_schemas::{FeedError, FeedResult, ServerInfo};

use crate::provider::ServerInfoFeed;
use crate::{transport_error, USER_AGENT};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Endpoint {
    info_url: Option<String>,
    join_code: Option<String>,
}

#[derive(Debug)]
pub struct FivemInfoClient {
    http: reqwest::Client,
    /// Base URL of the server-list lookup; the join code is appended.
    server_list_url: String,
    endpoints: RwLock<BTreeMap<String, Endpoint>>,
}

impl FivemInfoClient {
    /// HTTP client for game-server endpoints (certificate checks disabled).
    pub fn build_http(timeout: Duration) -> FeedResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::unavailable(format!("http client build failed: {e}")))
    }

    /// `regions` is `(region, info_url, join_code)`.
    pub fn new<I>(http: reqwest::Client, server_list_url: String, regions: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>, Option<String>)>,
    {
        let endpoints = regions
            .into_iter()
            .map(|(region, info_url, join_code)| (region, Endpoint { info_url, join_code }))
            .collect();
        Self {
            http,
            server_list_url,
            endpoints: RwLock::new(endpoints),
        }
    }

    /// Current info URL for `region`.
    pub async fn info_url(&self, region: &str) -> Option<String> {
        self.endpoints
            .read()
            .await
            .get(region)
            .and_then(|e| e.info_url.clone())
    }

    async fn lookup_endpoint(&self, join_code: &str) -> FeedResult<String> {
        let url = format!("{}/{}", self.server_list_url.trim_end_matches('/'), join_code);
        let resp = self.http.get(&url).send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::unavailable(format!(
                "server list HTTP {}",
                status.as_u16()
            )));
        }
        let body: WireServerListEntry = resp.json().await.map_err(transport_error)?;
        body.data
            .and_then(|d| d.connect_end_points.into_iter().next())
            .map(|ep| info_url_for(&ep))
            .ok_or_else(|| FeedError::unavailable("server list entry has no connect endpoint"))
    }
}

/// `"1.2.3.4:30120"` -> `"https://1.2.3.4:30120/info.json"`; full URLs keep
/// their scheme.
fn info_url_for(endpoint: &str) -> String {
    let ep = endpoint.trim().trim_end_matches('/');
    if ep.starts_with("http://") || ep.starts_with("https://") {
        format!("{ep}/info.json")
    } else {
        format!("https://{ep}/info.json")
    }
}

#[async_trait::async_trait]
impl ServerInfoFeed for FivemInfoClient {
    async fn fetch_info(&self, region: &str) -> FeedResult<ServerInfo> {
        let Some(url) = self.info_url(region).await else {
            return Err(FeedError::unavailable(format!(
                "no info url configured for region {region}"
            )));
        };

        let resp = self.http.get(&url).send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::unavailable(format!("HTTP {}", status.as_u16())));
        }
        let body: WireInfo = resp.json().await.map_err(transport_error)?;
        Ok(ServerInfo {
            time: body.vars.and_then(|v| v.time),
        })
    }

    async fn re_resolve(&self, region: &str) -> FeedResult<Option<String>> {
        let join_code = {
            let guard = self.endpoints.read().await;
            guard.get(region).and_then(|e| e.join_code.clone())
        };
        let Some(join_code) = join_code else {
            return Ok(None);
        };

        let new_url = match self.lookup_endpoint(&join_code).await {
            Ok(u) => u,
            Err(err) => {
                warn!(region, join_code = %join_code, error = %err, "endpoint re-resolution failed");
                return Err(err);
            }
        };

        let mut guard = self.endpoints.write().await;
        let entry = guard.entry(region.to_string()).or_default();
        if entry.info_url.as_deref() == Some(new_url.as_str()) {
            return Ok(None);
        }
        info!(region, old = ?entry.info_url, new = %new_url, "info endpoint re-resolved");
        entry.info_url = Some(new_url.clone());
        Ok(Some(new_url))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireInfo {
    #[serde(default)]
    vars: Option<WireVars>,
}

#[derive(Debug, Deserialize)]
struct WireVars {
    #[serde(default, rename = "Time")]
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireServerListEntry {
    #[serde(default, rename = "Data")]
    data: Option<WireServerListData>,
}

#[derive(Debug, Deserialize)]
struct WireServerListData {
    #[serde(default, rename = "connectEndPoints")]
    connect_end_points: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_to_info_url() {
        assert_eq!(
            info_url_for("15.204.215.61:30130"),
            "https://15.204.215.61:30130/info.json"
        );
        assert_eq!(
            info_url_for("http://127.0.0.1:4000/"),
            "http://127.0.0.1:4000/info.json"
        );
    }
}
