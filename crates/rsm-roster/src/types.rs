use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_name, KeyKind, TagPatterns};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque directory member id (a Discord user snowflake in production).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque role id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u64);

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
    pub id: MemberId,
    /// Name as shown in the directory; may carry `[TAG]` decorations.
    pub display_name: String,
    pub roles: BTreeSet<RoleId>,
}

impl DirectoryMember {
    pub fn new(
        id: u64,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            id: MemberId(id),
            display_name: display_name.into(),
            roles: roles.into_iter().map(RoleId).collect(),
        }
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Immutable, insertion-ordered view of the directory.
///
/// Match keys are computed once at construction with the snapshot's
/// [`TagPatterns`]; `index` maps a key to the first member that produced it.
#[derive(Clone, Debug, Default)]
pub struct DirectorySnapshot {
    members: Vec<DirectoryMember>,
    tagged: BTreeMap<String, usize>,
    untagged: BTreeMap<String, usize>,
    patterns: TagPatterns,
}

impl DirectorySnapshot {
    pub fn empty(patterns: TagPatterns) -> Self {
        Self {
            members: Vec::new(),
            tagged: BTreeMap::new(),
            untagged: BTreeMap::new(),
            patterns,
        }
    }

    pub fn new(members: Vec<DirectoryMember>, patterns: TagPatterns) -> Self {
        let index = |kind: KeyKind| {
            let mut index = BTreeMap::new();
            for (i, m) in members.iter().enumerate() {
                let key = normalize_name(&m.display_name, &patterns, kind);
                if !key.is_empty() {
                    index.entry(key).or_insert(i);
                }
            }
            index
        };
        let tagged = index(KeyKind::Tagged);
        let untagged = index(KeyKind::Untagged);
        Self {
            members,
            tagged,
            untagged,
            patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[DirectoryMember] {
        &self.members
    }

    pub fn patterns(&self) -> &TagPatterns {
        &self.patterns
    }

    /// First member (insertion order) whose `kind` key equals `key`.
    /// `key` must already be lowercased.
    pub(crate) fn lookup(&self, key: &str, kind: KeyKind) -> Option<&DirectoryMember> {
        let index = match kind {
            KeyKind::Tagged => &self.tagged,
            KeyKind::Untagged => &self.untagged,
        };
        index.get(key).and_then(|&i| self.members.get(i))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Display section a matched (or tagged) player lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Leadership,
    Member,
    AssociateCadet,
    AssociateTrainee,
    /// Carries the organizational tag but has no directory entry.
    UnmatchedMember,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Leadership => "leadership",
            Category::Member => "member",
            Category::AssociateCadet => "associate_cadet",
            Category::AssociateTrainee => "associate_trainee",
            Category::UnmatchedMember => "unmatched_member",
        }
    }

    pub fn is_associate(&self) -> bool {
        matches!(self, Category::AssociateCadet | Category::AssociateTrainee)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinguishing roles in precedence order: leadership > cadet > trainee > member.
///
/// A role left `None` never matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RolePrecedence {
    pub leadership: Option<RoleId>,
    pub cadet: Option<RoleId>,
    pub trainee: Option<RoleId>,
    pub member: Option<RoleId>,
}

impl RolePrecedence {
    fn ordered(&self) -> [(Option<RoleId>, Category); 4] {
        [
            (self.leadership, Category::Leadership),
            (self.cadet, Category::AssociateCadet),
            (self.trainee, Category::AssociateTrainee),
            (self.member, Category::Member),
        ]
    }

    /// Category of the highest-precedence distinguishing role `member` holds.
    pub fn category_for(&self, member: &DirectoryMember) -> Option<Category> {
        self.ordered()
            .into_iter()
            .find_map(|(role, cat)| role.filter(|r| member.has_role(*r)).map(|_| cat))
    }

    pub fn is_leadership(&self, member: &DirectoryMember) -> bool {
        self.leadership.is_some_and(|r| member.has_role(r))
    }
}

/// Display ranks, most senior first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankTable {
    ranks: Vec<(String, RoleId)>,
}

impl RankTable {
    pub fn new(ranks: impl IntoIterator<Item = (String, RoleId)>) -> Self {
        Self {
            ranks: ranks.into_iter().collect(),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ranks.iter().map(|(l, _)| l.as_str())
    }

    /// Index and label of the most senior rank `member` holds.
    pub fn rank_of(&self, member: &DirectoryMember) -> Option<(usize, &str)> {
        self.ranks
            .iter()
            .enumerate()
            .find(|(_, (_, role))| member.has_role(*role))
            .map(|(i, (label, _))| (i, label.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPlayer {
    pub username: String,
    pub category: Category,
    pub directory_id: Option<MemberId>,
    pub rank_label: Option<String>,
}

/// One region's classified players, rank-sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRoster {
    pub region: String,
    pub players: Vec<ClassifiedPlayer>,
}

impl RegionRoster {
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &ClassifiedPlayer> {
        self.players.iter().filter(move |p| p.category == category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.in_category(category).count()
    }

    /// Organization members online (leadership, members and unknown tagged players).
    pub fn org_online(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !p.category.is_associate())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
