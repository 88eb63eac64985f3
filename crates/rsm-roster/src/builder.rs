use std::collections::HashSet;

use rsm_schemas::RawPlayerRecord;

use crate::matcher::match_name;
use crate::types::{
    Category, ClassifiedPlayer, DirectorySnapshot, RankTable, RegionRoster, RolePrecedence,
};

/// Build one region's roster from the raw player list.
///
/// Classification:
/// - tagged, matched: `Leadership` if the member holds the leadership role,
///   otherwise `Member`;
/// - tagged, unmatched: `UnmatchedMember`;
/// - untagged, matched: category of the highest-precedence role held; a
///   member with no distinguishing role is not listed;
/// - untagged, unmatched: not listed.
///
/// Duplicated usernames are dropped before matching (first wins). The result
/// is stably sorted by rank index; unranked players keep input order after
/// all ranked players.
pub fn build_roster(
    region: &str,
    raw_players: &[RawPlayerRecord],
    snapshot: &DirectorySnapshot,
    precedence: &RolePrecedence,
    ranks: &RankTable,
) -> RegionRoster {
    let mut seen: HashSet<&str> = HashSet::with_capacity(raw_players.len());
    let mut ranked: Vec<(usize, ClassifiedPlayer)> = Vec::new();

    for raw in raw_players {
        if !seen.insert(raw.username.as_str()) {
            continue;
        }

        let m = match_name(&raw.username, snapshot);
        let category = match (m.org_tagged, m.member) {
            (true, Some(member)) if precedence.is_leadership(member) => Category::Leadership,
            (true, Some(_)) => Category::Member,
            (true, None) => Category::UnmatchedMember,
            (false, Some(member)) => match precedence.category_for(member) {
                Some(c) => c,
                None => continue,
            },
            (false, None) => continue,
        };

        let rank = m.member.and_then(|member| ranks.rank_of(member));
        ranked.push((
            rank.map(|(i, _)| i).unwrap_or(usize::MAX),
            ClassifiedPlayer {
                username: raw.username.clone(),
                category,
                directory_id: m.member.map(|member| member.id),
                rank_label: rank.map(|(_, label)| label.to_string()),
            },
        ));
    }

    // sort_by_key is stable
    ranked.sort_by_key(|(rank_idx, _)| *rank_idx);

    RegionRoster {
        region: region.to_string(),
        players: ranked.into_iter().map(|(_, p)| p).collect(),
    }
}
