use crate::normalize::{strip_org_prefix, KeyKind};
use crate::types::{DirectoryMember, DirectorySnapshot};

/// Outcome of matching one raw player name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameMatch<'a> {
    /// The raw name carried the organizational prefix tag.
    pub org_tagged: bool,
    pub member: Option<&'a DirectoryMember>,
}

/// Match a raw player name against the directory.
///
/// Tagged names (`"[SWAT] Alice"`) are compared with the tag removed against
/// directory names with prefix and suffix tags stripped. Untagged names are
/// compared as-is against directory names with only suffix tags stripped.
/// Comparison is case-insensitive and exact; the first member in directory
/// order wins.
pub fn match_name<'a>(raw: &str, snapshot: &'a DirectorySnapshot) -> NameMatch<'a> {
    let (org_tagged, key, kind) = match strip_org_prefix(raw, snapshot.patterns()) {
        Some(cleaned) => (true, cleaned.to_lowercase(), KeyKind::Tagged),
        None => (false, raw.to_lowercase(), KeyKind::Untagged),
    };
    let member = if key.is_empty() {
        None
    } else {
        snapshot.lookup(&key, kind)
    };
    NameMatch { org_tagged, member }
}
