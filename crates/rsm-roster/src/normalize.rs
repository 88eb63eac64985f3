//! Bracketed tag handling for player and directory names.
//!
//! One place owns tag formats. A prefix tag is `[TAG]` at the start of a name
//! (`"[SWAT] Alice"`, `"[swat]Alice"`, `" [ SWAT ] Alice"`); suffix tags are
//! `[TAG]` groups at the end (`"Alice [CADET]"`). Tag comparison is
//! case-insensitive and tolerant of whitespace inside and around brackets.

/// Known tags, stored uppercase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagPatterns {
    prefix_tags: Vec<String>,
    suffix_tags: Vec<String>,
}

impl TagPatterns {
    /// `org_tag` is the only accepted prefix; `suffix_tags` are stripped from
    /// the end of directory names.
    pub fn new<I, S>(org_tag: &str, suffix_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefix_tags = match org_tag.trim() {
            "" => Vec::new(),
            t => vec![t.to_uppercase()],
        };
        Self {
            prefix_tags,
            suffix_tags: suffix_tags
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    fn is_prefix_tag(&self, tag: &str) -> bool {
        let t = tag.trim().to_uppercase();
        self.prefix_tags.iter().any(|p| *p == t)
    }

    fn is_suffix_tag(&self, tag: &str) -> bool {
        let t = tag.trim().to_uppercase();
        self.suffix_tags.iter().any(|p| *p == t)
    }
}

/// The name after a leading organizational tag, or `None` if there is none.
pub fn strip_org_prefix<'a>(name: &'a str, patterns: &TagPatterns) -> Option<&'a str> {
    let rest = name.trim_start().strip_prefix('[')?;
    let close = rest.find(']')?;
    if !patterns.is_prefix_tag(&rest[..close]) {
        return None;
    }
    Some(rest[close + 1..].trim())
}

/// Remove trailing known tags, repeatedly (`"Bob [SWAT] [CADET]"` → `"Bob"`).
pub fn strip_suffix_tags<'a>(name: &'a str, patterns: &TagPatterns) -> &'a str {
    let mut cur = name.trim_end();
    while let Some(body) = cur.strip_suffix(']') {
        let Some(open) = body.rfind('[') else {
            break;
        };
        if !patterns.is_suffix_tag(&body[open + 1..]) {
            break;
        }
        cur = body[..open].trim_end();
    }
    cur
}

/// Which tags come off a directory name when building its match key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    /// Prefix and suffix tags. Compared against player names that carried
    /// the organizational tag.
    Tagged,
    /// Suffix tags only. Compared against untagged player names, so
    /// `"[SWAT] Bob"` is never reachable as plain `"Bob"`.
    Untagged,
}

/// Directory-side match key: tags removed per `kind`, trimmed, lowercased.
pub fn normalize_name(name: &str, patterns: &TagPatterns, kind: KeyKind) -> String {
    let base = match kind {
        KeyKind::Tagged => strip_org_prefix(name, patterns).unwrap_or(name),
        KeyKind::Untagged => name,
    };
    strip_suffix_tags(base, patterns).trim().to_lowercase()
}
