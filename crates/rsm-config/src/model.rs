//! Typed monitor configuration.
//!
//! Every section and field has a default so a minimal file only needs the
//! regions, the guild/channel ids and the role ids. Durations are stored in
//! plain integer units in YAML and exposed as [`Duration`] accessors.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub schedule: ScheduleConfig,
    pub regions: Vec<RegionConfig>,
    pub presentation: PresentationConfig,
    pub feeds: FeedsConfig,
    pub directory: DirectoryConfig,
    pub discord: DiscordConfig,
    pub publish: PublishConfig,
    pub alerts: AlertsConfig,
    pub status_api: StatusApiConfig,
    pub secrets: SecretsConfig,
}

/// No region is configured; a tick has nothing to monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMissing {
    pub what: &'static str,
}

impl fmt::Display for ConfigMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONFIG_MISSING: no {} configured", self.what)
    }
}

impl std::error::Error for ConfigMissing {}

impl MonitorConfig {
    /// Configured regions, or [`ConfigMissing`] when there are none.
    pub fn require_regions(&self) -> Result<&[RegionConfig], ConfigMissing> {
        if self.regions.is_empty() {
            return Err(ConfigMissing { what: "regions" });
        }
        Ok(&self.regions)
    }

    /// Region names in configuration order.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.name.clone()).collect()
    }

    pub fn region(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// The human-chosen display order. Falls back to configuration order.
    pub fn preferred_order(&self) -> Vec<String> {
        if self.presentation.preferred_order.is_empty() {
            self.region_names()
        } else {
            self.presentation.preferred_order.clone()
        }
    }

    /// Non-fatal configuration problems, one line each.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen = BTreeSet::new();
        for r in &self.regions {
            if !seen.insert(r.name.as_str()) {
                warnings.push(format!("duplicate region name '{}'", r.name));
            }
            if r.info_url.is_none() && r.join_code.is_none() {
                warnings.push(format!(
                    "region '{}' has neither info_url nor join_code; server info will be unavailable",
                    r.name
                ));
            }
        }
        for name in &self.presentation.preferred_order {
            if !seen.contains(name.as_str()) {
                warnings.push(format!("preferred_order names unknown region '{name}'"));
            }
        }
        if self.directory.guild_id == 0 {
            warnings.push("directory.guild_id is not set".to_string());
        }
        if self.publish.channel_id == 0 {
            warnings.push("publish.channel_id is not set".to_string());
        }
        if self.publish.max_attempts == 0 {
            warnings.push("publish.max_attempts is 0; treated as 1".to_string());
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub tick_interval_secs: u64,
    pub directory_ttl_secs: u64,
    pub stale_heartbeat_secs: u64,
    /// Consecutive failed ticks before a region's endpoint is re-resolved.
    pub failure_threshold: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            directory_ttl_secs: 300,
            stale_heartbeat_secs: 600,
            failure_threshold: 5,
        }
    }
}

impl ScheduleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn directory_ttl(&self) -> Duration {
        Duration::from_secs(self.directory_ttl_secs)
    }

    pub fn stale_heartbeat(&self) -> Duration {
        Duration::from_secs(self.stale_heartbeat_secs)
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Display name, e.g. `"NA1"`.
    pub name: String,
    /// Id used by the players/servers API (`"US1"` for `"NA1"`). Defaults to `name`.
    pub server_id: Option<String>,
    /// Server-info endpoint (`https://host:port/info.json`).
    pub info_url: Option<String>,
    /// Server-list join code used to re-resolve `info_url`.
    pub join_code: Option<String>,
    /// Title prefix, e.g. a flag emoji. Derived from the region family when unset.
    pub flag: Option<String>,
}

impl RegionConfig {
    pub fn api_server_id(&self) -> &str {
        self.server_id.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub preferred_order: Vec<String>,
    /// Simulated minutes per real minute, for the restart countdown.
    pub restart_ratio: u32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            preferred_order: Vec::new(),
            restart_ratio: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub players_url: String,
    pub servers_url: String,
    pub server_list_url: String,
    /// Read players from this JSON file instead of the API (testing).
    pub local_players_json: Option<String>,
    pub players_timeout_ms: u64,
    pub queue_timeout_ms: u64,
    pub server_info_timeout_ms: u64,
    /// Bound on one full directory listing (all pages).
    pub directory_timeout_ms: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            players_url: "https://api.gtacnr.net/cnr/players".to_string(),
            servers_url: "https://api.gtacnr.net/cnr/servers".to_string(),
            server_list_url: "https://servers-frontend.fivem.net/api/servers/single".to_string(),
            local_players_json: None,
            players_timeout_ms: 5_000,
            queue_timeout_ms: 5_000,
            server_info_timeout_ms: 3_000,
            directory_timeout_ms: 15_000,
        }
    }
}

impl FeedsConfig {
    pub fn players_timeout(&self) -> Duration {
        Duration::from_millis(self.players_timeout_ms)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn server_info_timeout(&self) -> Duration {
        Duration::from_millis(self.server_info_timeout_ms)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub guild_id: u64,
    /// Organizational tag, written `[TAG]` in player and member names.
    pub org_tag: String,
    /// Tags stripped from the end of directory names before comparison.
    pub suffix_tags: Vec<String>,
    pub roles: RoleIdsConfig,
    /// Rank table, most senior first.
    pub ranks: Vec<RankConfig>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            org_tag: "SWAT".to_string(),
            suffix_tags: vec![
                "CADET".to_string(),
                "TRAINEE".to_string(),
                "SWAT".to_string(),
            ],
            roles: RoleIdsConfig::default(),
            ranks: Vec::new(),
        }
    }
}

/// Distinguishing roles. Precedence is fixed: leadership > cadet > trainee > member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleIdsConfig {
    pub leadership: Option<u64>,
    pub cadet: Option<u64>,
    pub trainee: Option<u64>,
    pub member: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankConfig {
    pub label: String,
    pub role: u64,
}

// ---------------------------------------------------------------------------
// Discord / publishing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub api_base_url: String,
    /// Per-request bound for every call on the shared HTTP client
    /// (Discord REST and Telegram).
    pub request_timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://discord.com/api/v10".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl DiscordConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub channel_id: u64,
    /// Persisted slot table (JSON).
    pub slots_file: String,
    pub max_attempts: u32,
    pub backoff_secs: u64,
    pub inter_slot_delay_ms: u64,
    pub emojis: EmojiIdsConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            channel_id: 0,
            slots_file: "slots.json".to_string(),
            max_attempts: 3,
            backoff_secs: 5,
            inter_slot_delay_ms: 1_000,
            emojis: EmojiIdsConfig::default(),
        }
    }
}

impl PublishConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn inter_slot_delay(&self) -> Duration {
        Duration::from_millis(self.inter_slot_delay_ms)
    }
}

/// Guild emoji ids used on the status cards. Missing ones fall back to `⚫`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiIdsConfig {
    pub leadership: Option<u64>,
    pub cadet: Option<u64>,
    pub trainee: Option<u64>,
    pub org: Option<u64>,
}

// ---------------------------------------------------------------------------
// Alerts / status API / secrets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub window_secs: u64,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            telegram_chat_id: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl AlertsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusApiConfig {
    /// `host:port`; the status API is disabled when unset.
    pub addr: Option<String>,
}

/// Names of the env vars holding tokens. Never the tokens themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub discord_token_env: String,
    pub telegram_token_env: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            discord_token_env: "RSM_DISCORD_TOKEN".to_string(),
            telegram_token_env: "RSM_TELEGRAM_TOKEN".to_string(),
        }
    }
}
