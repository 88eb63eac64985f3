//! Status card rendering.
//!
//! A card is a chat-platform-neutral embed: title, colour, fields, footer,
//! timestamp. `rsm-discord` serializes it to the Discord embed shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rsm_roster::{Category, ClassifiedPlayer};
use rsm_status::RegionReport;

pub const COLOR_ONLINE: u32 = 0x28ef05;
pub const COLOR_OFFLINE: u32 = 0xf40006;
pub const EMOJI_FALLBACK: &str = "⚫";

const UNKNOWN_IDENTITY: &str = "❔";
const BLANK: &str = "\u{200b}";
const NO_DATA: &str = "```no data```";

/// Longest field value the chat platform accepts, in UTF-16 units.
pub const FIELD_VALUE_LIMIT: usize = 1024;
/// Room kept for the `"… and N more"` line while filling a section.
const OVERFLOW_RESERVE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl CardField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCard {
    pub title: String,
    pub color: u32,
    pub fields: Vec<CardField>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StatusCard {
    /// Neutral content for a freshly created slot.
    pub fn placeholder() -> Self {
        Self {
            title: "Loading status...".to_string(),
            color: 0x808080,
            fields: Vec::new(),
            footer: None,
            timestamp: None,
        }
    }
}

/// Rendered guild emojis; any missing one falls back to [`EMOJI_FALLBACK`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmojiSet {
    pub leadership: Option<String>,
    pub cadet: Option<String>,
    pub trainee: Option<String>,
    pub org: Option<String>,
}

impl EmojiSet {
    fn or_fallback(e: &Option<String>) -> &str {
        e.as_deref().unwrap_or(EMOJI_FALLBACK)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardStyle {
    /// Organization tag as shown in headings (`"SWAT"`).
    pub org_tag: String,
    /// Heading for the leadership section, e.g. `"Mentors"`.
    pub leadership_label: String,
    pub refresh_secs: u64,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            org_tag: "SWAT".to_string(),
            leadership_label: "Mentors".to_string(),
            refresh_secs: 60,
        }
    }
}

/// Flag for a region family (`EU1` -> EU). `None` for unknown families.
pub fn region_flag(region: &str) -> Option<&'static str> {
    match region.trim_end_matches(|c: char| c.is_ascii_digit()) {
        "EU" => Some("🇪🇺"),
        "NA" | "US" => Some("🇺🇸"),
        "SEA" => Some("🇸🇬"),
        _ => None,
    }
}

fn identity(p: &ClassifiedPlayer) -> String {
    match p.directory_id {
        Some(id) => format!("<@{id}>"),
        None => UNKNOWN_IDENTITY.to_string(),
    }
}

fn width(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Join section lines into one field value within [`FIELD_VALUE_LIMIT`].
/// Lines that no longer fit collapse into a trailing `"… and N more"`.
fn section<I>(lines: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let lines: Vec<String> = lines.into_iter().collect();
    let mut out = String::new();
    let mut used = 0;
    for (i, line) in lines.iter().enumerate() {
        let last = i + 1 == lines.len();
        let reserve = if last { 0 } else { OVERFLOW_RESERVE };
        let w = width(line);
        if used + w + reserve > FIELD_VALUE_LIMIT {
            out.push_str(&format!("\n… and {} more", lines.len() - i));
            break;
        }
        out.push_str(line);
        used += w;
    }
    out
}

pub fn render_card(
    report: &RegionReport,
    flag: Option<&str>,
    emojis: &EmojiSet,
    style: &CardStyle,
    now: DateTime<Utc>,
) -> StatusCard {
    let region = report.region();
    let title = match flag.or_else(|| region_flag(region)) {
        Some(f) => format!("{f} {region}"),
        None => region.to_string(),
    };

    let mut fields = Vec::new();
    let color = if report.verdict.online {
        render_online(report, emojis, style, &mut fields);
        COLOR_ONLINE
    } else {
        fields.push(CardField::new("Server or API down?", "No Data for this server!", false));
        fields.push(CardField::new("🎮Players:", NO_DATA, true));
        fields.push(CardField::new("⌛Queue:", NO_DATA, true));
        COLOR_OFFLINE
    };

    StatusCard {
        title,
        color,
        fields,
        footer: Some(format!("Refreshes every {} seconds", style.refresh_secs)),
        timestamp: Some(now),
    }
}

fn render_online(
    report: &RegionReport,
    emojis: &EmojiSet,
    style: &CardStyle,
    fields: &mut Vec<CardField>,
) {
    let roster = &report.roster;

    let leaders = section(
        roster
            .in_category(Category::Leadership)
            .map(|p| format!("\n - {} ({})", p.username, identity(p))),
    );
    if !leaders.is_empty() {
        fields.push(CardField::new(
            format!(
                "{}{} Online:",
                EmojiSet::or_fallback(&emojis.leadership),
                style.leadership_label
            ),
            leaders,
            false,
        ));
    }

    let members = section(
        roster
            .players
            .iter()
            .filter(|p| matches!(p.category, Category::Member | Category::UnmatchedMember))
            .map(|p| format!("\n - {} ({})", p.username, identity(p))),
    );
    if !members.is_empty() {
        fields.push(CardField::new(format!("{} Online:", style.org_tag), members, false));
    }

    let associates = section(roster.players.iter().filter_map(|p| {
        let emoji = match p.category {
            Category::AssociateCadet => EmojiSet::or_fallback(&emojis.cadet),
            Category::AssociateTrainee => EmojiSet::or_fallback(&emojis.trainee),
            _ => return None,
        };
        Some(format!("\n{emoji} {} ({})", p.username, identity(p)))
    }));
    if !associates.is_empty() {
        fields.push(CardField::new("Cadets / Trainees Online:", associates, false));
    }

    if roster.is_empty() {
        fields.push(CardField::new("*Nobody is online*", BLANK, false));
    }

    let org_label = format!("{}{}:", EmojiSet::or_fallback(&emojis.org), style.org_tag);
    let org_count = format!("``` {} ```", roster.org_online());
    match &report.queue {
        Some(q) => {
            fields.push(CardField::new(org_label, org_count, true));
            fields.push(CardField::new(
                "🎮Players:",
                format!("```{}/{}```", q.players, q.max_players),
                true,
            ));
            fields.push(CardField::new(
                "⌛Queue:",
                format!("```{}```", q.queued_players),
                true,
            ));
            let restart = match &report.restart {
                Some(c) => format!("*{}*", c.describe()),
                None => "*No restart data available!*".to_string(),
            };
            fields.push(CardField::new(BLANK, restart, false));
        }
        None => {
            fields.push(CardField::new(org_label, org_count, true));
            fields.push(CardField::new("🎮Players:", NO_DATA, true));
            fields.push(CardField::new("⌛Queue:", NO_DATA, true));
        }
    }
}
