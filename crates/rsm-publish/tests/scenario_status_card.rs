//! Scenario: status card rendering.
//!
//! # Invariants under test
//!
//! 1. Online cards are green, list leadership / members / associates in
//!    their own sections, and show players, queue and restart countdown.
//! 2. Unknown tagged players carry the unknown-identity marker.
//! 3. An online region with nobody of ours shows "Nobody is online" (not the
//!    offline placeholder).
//! 4. Offline cards are red and show the fixed "no data" placeholder,
//!    whatever the roster says.
//! 5. A busy region never produces a field value over the platform limit;
//!    the overflow is summarized as "… and N more".

use chrono::{TimeZone, Utc};

use rsm_publish::{
    render_card, CardStyle, EmojiSet, StatusCard, COLOR_OFFLINE, COLOR_ONLINE, FIELD_VALUE_LIMIT,
};
use rsm_roster::{Category, ClassifiedPlayer, MemberId, RegionRoster};
use rsm_schemas::QueueEntry;
use rsm_status::{RegionReport, RegionVerdict, RestartCountdown, VerdictReason};

fn player(name: &str, category: Category, id: Option<u64>) -> ClassifiedPlayer {
    ClassifiedPlayer {
        username: name.to_string(),
        category,
        directory_id: id.map(MemberId),
        rank_label: None,
    }
}

fn report(online: bool, players: Vec<ClassifiedPlayer>) -> RegionReport {
    RegionReport {
        verdict: if online {
            RegionVerdict::online("EU1")
        } else {
            RegionVerdict::offline("EU1", VerdictReason::StaleHeartbeat)
        },
        roster: RegionRoster {
            region: "EU1".to_string(),
            players,
        },
        queue: Some(QueueEntry {
            players: 97,
            max_players: 128,
            queued_players: 3,
            last_heartbeat: None,
        }),
        restart: Some(RestartCountdown { real_minutes: 138 }),
    }
}

fn render(r: &RegionReport) -> StatusCard {
    let emojis = EmojiSet {
        leadership: Some("<:mentor:1>".to_string()),
        cadet: Some("<:cadet:2>".to_string()),
        trainee: None,
        org: Some("<:swat:4>".to_string()),
    };
    render_card(
        r,
        None,
        &emojis,
        &CardStyle::default(),
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap(),
    )
}

fn field<'a>(card: &'a StatusCard, name: &str) -> Option<&'a str> {
    card.fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.value.as_str())
}

#[test]
fn online_card_sections_and_stats() {
    let card = render(&report(
        true,
        vec![
            player("[SWAT] Mike", Category::Leadership, Some(1)),
            player("[SWAT] Sam", Category::Member, Some(2)),
            player("[SWAT] Ghost", Category::UnmatchedMember, None),
            player("Cody", Category::AssociateCadet, Some(3)),
            player("Tina", Category::AssociateTrainee, Some(4)),
        ],
    ));

    assert_eq!(card.title, "🇪🇺 EU1");
    assert_eq!(card.color, COLOR_ONLINE);
    assert_eq!(
        field(&card, "<:mentor:1>Mentors Online:"),
        Some("\n - [SWAT] Mike (<@1>)")
    );
    assert_eq!(
        field(&card, "SWAT Online:"),
        Some("\n - [SWAT] Sam (<@2>)\n - [SWAT] Ghost (❔)")
    );
    assert_eq!(
        field(&card, "Cadets / Trainees Online:"),
        Some("\n<:cadet:2> Cody (<@3>)\n⚫ Tina (<@4>)")
    );
    assert_eq!(field(&card, "<:swat:4>SWAT:"), Some("``` 3 ```"));
    assert_eq!(field(&card, "🎮Players:"), Some("```97/128```"));
    assert_eq!(field(&card, "⌛Queue:"), Some("```3```"));
    assert!(card
        .fields
        .iter()
        .any(|f| f.value == "*Next restart in ~2 hours and 18 minutes*"));
    assert_eq!(card.footer.as_deref(), Some("Refreshes every 60 seconds"));
    assert!(card.timestamp.is_some());
}

#[test]
fn nobody_online_is_distinct_from_offline() {
    let card = render(&report(true, Vec::new()));
    assert_eq!(card.color, COLOR_ONLINE);
    assert!(card.fields.iter().any(|f| f.name == "*Nobody is online*"));
    assert_eq!(field(&card, "<:swat:4>SWAT:"), Some("``` 0 ```"));
    assert!(field(&card, "Server or API down?").is_none());
}

#[test]
fn offline_card_ignores_roster() {
    let card = render(&report(
        false,
        vec![player("[SWAT] Sam", Category::Member, Some(2))],
    ));
    assert_eq!(card.color, COLOR_OFFLINE);
    assert_eq!(field(&card, "Server or API down?"), Some("No Data for this server!"));
    assert_eq!(field(&card, "🎮Players:"), Some("```no data```"));
    assert!(field(&card, "SWAT Online:").is_none());
}

#[test]
fn missing_restart_data_is_stated() {
    let mut r = report(true, Vec::new());
    r.restart = None;
    let card = render(&r);
    assert!(card
        .fields
        .iter()
        .any(|f| f.value == "*No restart data available!*"));
}

#[test]
fn busy_region_fields_stay_within_limit() {
    let mut players: Vec<ClassifiedPlayer> = (0..40)
        .map(|i| {
            player(
                &format!("[SWAT] Officer_Player_{i:02}"),
                Category::Member,
                Some(1_300_519_755_622_383_600 + i),
            )
        })
        .collect();
    players.extend(
        (0..40).map(|i| player(&format!("Cadet_Player_{i:02}"), Category::AssociateCadet, Some(i))),
    );
    let card = render(&report(true, players));

    for f in &card.fields {
        assert!(
            f.value.encode_utf16().count() <= FIELD_VALUE_LIMIT,
            "field {:?} is {} long",
            f.name,
            f.value.len()
        );
    }

    let members = field(&card, "SWAT Online:").unwrap();
    assert!(members.starts_with("\n - [SWAT] Officer_Player_00 (<@1300519755622383600>)"));
    let shown = members.matches("\n - ").count();
    assert!(shown < 40);
    assert!(members.ends_with(&format!("\n… and {} more", 40 - shown)));

    let total: usize = card.fields.iter().map(|f| f.name.len() + f.value.len()).sum();
    assert!(total + card.title.len() < 6_000);
    // the count is not truncated
    assert_eq!(field(&card, "<:swat:4>SWAT:"), Some("``` 40 ```"));
}
