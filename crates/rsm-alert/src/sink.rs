use std::fmt;

use async_trait::async_trait;
use tracing::warn;

/// Telegram rejects messages above 4096 characters.
const TELEGRAM_MAX_CHARS: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertError {
    Delivery(String),
}

impl fmt::Display for AlertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertError::Delivery(msg) => write!(f, "alert delivery failed: {msg}"),
        }
    }
}

impl std::error::Error for AlertError {}

/// Side channel for operational alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), AlertError>;
}

/// Writes alerts to the log only. Used when no Telegram chat is configured.
#[derive(Clone, Debug, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, text: &str) -> Result<(), AlertError> {
        warn!(alert = %text, "alert (no side channel configured)");
        Ok(())
    }
}

/// Telegram Bot API `sendMessage`.
///
/// The bot token is part of the request path; it never appears in errors
/// or logs produced here.
#[derive(Clone)]
pub struct TelegramAlertSink {
    http: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl fmt::Debug for TelegramAlertSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramAlertSink")
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramAlertSink {
    pub fn new(http: reqwest::Client, api_url: String, token: String, chat_id: String) -> Self {
        Self {
            http,
            api_url,
            token,
            chat_id,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl AlertSink for TelegramAlertSink {
    async fn notify(&self, text: &str) -> Result<(), AlertError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            self.token
        );
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": truncate_chars(text, TELEGRAM_MAX_CHARS),
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            // without_url keeps the token out of the message
            .map_err(|e| AlertError::Delivery(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AlertError::Delivery(format!(
                "telegram HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
