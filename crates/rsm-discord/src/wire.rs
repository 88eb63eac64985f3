//! Discord JSON shapes (only the fields the monitor reads or writes).

use serde::Deserialize;
use serde_json::{json, Value};

use rsm_publish::StatusCard;
use rsm_roster::DirectoryMember;

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Emoji {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GuildMember {
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl GuildMember {
    /// Display name resolution: guild nick, then global name, then username.
    pub fn into_directory_member(self) -> Option<DirectoryMember> {
        let user = self.user?;
        let id: u64 = user.id.parse().ok()?;
        let display_name = self
            .nick
            .filter(|n| !n.is_empty())
            .or(user.global_name.filter(|n| !n.is_empty()))
            .unwrap_or(user.username);
        let roles = self.roles.iter().filter_map(|r| r.parse::<u64>().ok());
        Some(DirectoryMember::new(id, display_name, roles))
    }
}

/// Discord embed object for a status card.
pub fn card_to_embed(card: &StatusCard) -> Value {
    let fields: Vec<Value> = card
        .fields
        .iter()
        .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
        .collect();

    let mut embed = json!({
        "title": card.title,
        "color": card.color,
        "fields": fields,
    });
    if let Some(footer) = &card.footer {
        embed["footer"] = json!({ "text": footer });
    }
    if let Some(ts) = &card.timestamp {
        embed["timestamp"] = json!(ts.to_rfc3339());
    }
    embed
}
