//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (`secrets.discord_token_env`).
//! - At startup the binary calls [`resolve_secrets`] once and passes the
//!   result into client constructors; nothing else reads tokens from the
//!   environment.
//! - `Debug` output redacts every value.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! The Discord bot token is required (the monitor cannot publish without
//! it). The Telegram token is optional; without it alerts are only logged.

use anyhow::{bail, Result};

use crate::SecretsConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub discord_token: String,
    pub telegram_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("discord_token", &"<REDACTED>")
            .field(
                "telegram_token",
                &self.telegram_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable; `None` if unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve all secrets named in `cfg` from the process environment.
///
/// # Errors
/// Returns `Err` naming the env var when the Discord token is missing.
pub fn resolve_secrets(cfg: &SecretsConfig) -> Result<ResolvedSecrets> {
    let Some(discord_token) = resolve_env(&cfg.discord_token_env) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (discord bot token) is not set or empty",
            cfg.discord_token_env
        );
    };

    Ok(ResolvedSecrets {
        discord_token,
        telegram_token: resolve_env(&cfg.telegram_token_env),
    })
}
