//! Production collaborators built from configuration and resolved secrets.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use rsm_alert::{AlertSink, LogAlertSink, TelegramAlertSink};
use rsm_config::{secrets::ResolvedSecrets, EmojiIdsConfig, MonitorConfig};
use rsm_discord::DiscordClient;
use rsm_feeds::{CnrApiClient, FivemInfoClient, LocalJsonPlayerFeed, PlayerFeed, USER_AGENT};
use rsm_publish::EmojiSet;

use crate::scheduler::Collaborators;

/// HTTP clients for every upstream named in `cfg`.
///
/// The Discord client is returned separately as well for the startup emoji
/// lookup.
pub fn build_collaborators(
    cfg: &MonitorConfig,
    secrets: &ResolvedSecrets,
) -> Result<(Collaborators, DiscordClient)> {
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(cfg.discord.request_timeout())
        .build()
        .context("http client build failed")?;

    let cnr = Arc::new(CnrApiClient::new(
        http.clone(),
        cfg.feeds.players_url.clone(),
        cfg.feeds.servers_url.clone(),
        cfg.regions
            .iter()
            .map(|r| (r.name.clone(), r.api_server_id().to_string())),
    ));

    let players: Arc<dyn PlayerFeed> = match &cfg.feeds.local_players_json {
        Some(path) => {
            info!(path = %path, "reading players from local json");
            Arc::new(LocalJsonPlayerFeed::new(path))
        }
        None => cnr.clone(),
    };

    let info_http = FivemInfoClient::build_http(cfg.feeds.server_info_timeout())
        .context("server-info http client build failed")?;
    let info = Arc::new(FivemInfoClient::new(
        info_http,
        cfg.feeds.server_list_url.clone(),
        cfg.regions
            .iter()
            .map(|r| (r.name.clone(), r.info_url.clone(), r.join_code.clone())),
    ));

    let discord = DiscordClient::new(
        http.clone(),
        cfg.discord.api_base_url.clone(),
        secrets.discord_token.clone(),
        cfg.directory.guild_id,
    );

    let alerts: Arc<dyn AlertSink> = match (&secrets.telegram_token, &cfg.alerts.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Arc::new(TelegramAlertSink::new(
            http,
            cfg.alerts.telegram_api_url.clone(),
            token.clone(),
            chat_id.clone(),
        )),
        _ => {
            warn!("telegram alerts not configured; alerts are only logged");
            Arc::new(LogAlertSink)
        }
    };

    let collab = Collaborators {
        players,
        queue: cnr,
        info,
        directory: Arc::new(discord.clone()),
        chat: Arc::new(discord.clone()),
        alerts,
    };
    Ok((collab, discord))
}

/// Resolve the configured emoji ids against the guild's emoji list.
///
/// A failed lookup is not fatal: every emoji then falls back to the default
/// marker on the cards.
pub async fn resolve_emojis(discord: &DiscordClient, ids: &EmojiIdsConfig) -> EmojiSet {
    let known = match discord.guild_emojis().await {
        Ok(known) => known,
        Err(err) => {
            warn!(error = %err, "guild emoji lookup failed; using fallback emoji");
            return EmojiSet::default();
        }
    };
    let pick = |id: Option<u64>| id.and_then(|id| known.get(&id).cloned());
    let set = EmojiSet {
        leadership: pick(ids.leadership),
        cadet: pick(ids.cadet),
        trainee: pick(ids.trainee),
        org: pick(ids.org),
    };
    info!(guild_emojis = known.len(), "emojis resolved");
    set
}
