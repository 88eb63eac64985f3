//! rsm-discord
//!
//! Minimal Discord REST client for the monitor:
//! - message create/edit ([`ChatPublisher`]) for the status slots
//! - guild member listing ([`DirectorySource`]) for the directory cache
//! - guild emoji lookup for card decorations
//!
//! Only REST is used; no gateway connection is opened.
//!
//! # Error classes
//! - 429, 5xx and transport failures are transient
//! - every other non-success status is permanent (404 Unknown Message,
//!   403 Missing Access, 400 invalid body)

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tracing::debug;

use rsm_publish::{ChatPublisher, PublishError, StatusCard};
use rsm_roster::{DirectoryError, DirectoryMember, DirectorySource};

mod wire;

pub use wire::card_to_embed;

/// Page size for `GET /guilds/{id}/members` (Discord maximum).
const MEMBER_PAGE_LIMIT: usize = 1000;

#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    guild_id: u64,
}

impl fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .field("guild_id", &self.guild_id)
            .finish()
    }
}

impl DiscordClient {
    pub fn new(http: reqwest::Client, base_url: String, token: String, guild_id: u64) -> Self {
        Self {
            http,
            base_url,
            token,
            guild_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Every custom emoji of the guild, formatted for message text
    /// (`<:name:id>` / `<a:name:id>`), keyed by emoji id.
    pub async fn guild_emojis(&self) -> Result<BTreeMap<u64, String>, PublishError> {
        let req = self.auth(self.http.get(self.url(&format!("/guilds/{}/emojis", self.guild_id))));
        let resp = req.send().await.map_err(transport)?;
        let resp = check_status(resp).await?;
        let emojis: Vec<wire::Emoji> = resp.json().await.map_err(transport)?;

        Ok(emojis
            .into_iter()
            .filter_map(|e| {
                let id: u64 = e.id?.parse().ok()?;
                let name = e.name?;
                let prefix = if e.animated { "a" } else { "" };
                Some((id, format!("<{prefix}:{name}:{id}>")))
            })
            .collect())
    }
}

fn transport(err: reqwest::Error) -> PublishError {
    PublishError::Transient(err.without_url().to_string())
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after: Option<f64>,
}

/// Non-success HTTP response, already classified.
#[derive(Debug)]
enum HttpFailure {
    Transient(String),
    Permanent(String),
}

impl HttpFailure {
    fn detail(self) -> String {
        match self {
            HttpFailure::Transient(d) | HttpFailure::Permanent(d) => d,
        }
    }
}

impl From<HttpFailure> for PublishError {
    fn from(f: HttpFailure) -> Self {
        match f {
            HttpFailure::Transient(d) => PublishError::Transient(d),
            HttpFailure::Permanent(d) => PublishError::Permanent(d),
        }
    }
}

/// Pass through success responses; classify the rest.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, HttpFailure> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: Option<ApiError> = resp.json().await.ok();
    let detail = match &body {
        Some(ApiError {
            message,
            retry_after: Some(secs),
        }) => format!("HTTP {} {message} (retry after {secs}s)", status.as_u16()),
        Some(ApiError { message, .. }) if !message.is_empty() => {
            format!("HTTP {} {message}", status.as_u16())
        }
        _ => format!("HTTP {}", status.as_u16()),
    };
    if status.as_u16() == 429 || status.is_server_error() {
        Err(HttpFailure::Transient(detail))
    } else {
        Err(HttpFailure::Permanent(detail))
    }
}

#[async_trait::async_trait]
impl ChatPublisher for DiscordClient {
    async fn create_message(&self, channel_id: u64, card: &StatusCard) -> Result<u64, PublishError> {
        let body = serde_json::json!({ "embeds": [card_to_embed(card)] });
        let req = self
            .auth(self.http.post(self.url(&format!("/channels/{channel_id}/messages"))))
            .json(&body);
        let resp = check_status(req.send().await.map_err(transport)?).await?;
        let msg: wire::Message = resp.json().await.map_err(transport)?;
        msg.id
            .parse()
            .map_err(|_| PublishError::Permanent(format!("invalid message id '{}'", msg.id)))
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        card: &StatusCard,
    ) -> Result<(), PublishError> {
        let body = serde_json::json!({ "embeds": [card_to_embed(card)] });
        let req = self
            .auth(
                self.http
                    .patch(self.url(&format!("/channels/{channel_id}/messages/{message_id}"))),
            )
            .json(&body);
        check_status(req.send().await.map_err(transport)?).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DirectorySource for DiscordClient {
    async fn list_members(&self) -> Result<Vec<DirectoryMember>, DirectoryError> {
        let mut out = Vec::new();
        let mut after: u64 = 0;

        loop {
            let limit = MEMBER_PAGE_LIMIT.to_string();
            let after_s = after.to_string();
            let req = self
                .auth(self.http.get(self.url(&format!("/guilds/{}/members", self.guild_id))))
                .query(&[("limit", limit.as_str()), ("after", after_s.as_str())]);

            let resp = req
                .send()
                .await
                .map_err(|e| DirectoryError::Unavailable(e.without_url().to_string()))?;
            let resp = check_status(resp)
                .await
                .map_err(|e| DirectoryError::Unavailable(e.detail()))?;
            let page: Vec<wire::GuildMember> = resp
                .json()
                .await
                .map_err(|e| DirectoryError::Unavailable(format!("decode members: {}", e.without_url())))?;

            let page_len = page.len();
            let cursor = after;
            for m in page {
                let Some(member) = m.into_directory_member() else {
                    continue;
                };
                after = after.max(member.id.0);
                out.push(member);
            }
            debug!(page_len, total = out.len(), "guild members page");

            if page_len < MEMBER_PAGE_LIMIT || after == cursor {
                break;
            }
        }

        Ok(out)
    }
}
