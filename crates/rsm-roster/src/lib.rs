//! rsm-roster
//!
//! Directory snapshot caching, player-name matching and roster building.
//!
//! Invariants:
//! - The directory snapshot is replaced wholesale on refresh, never patched.
//! - A failed refresh keeps the previous snapshot; one attempt per call.
//! - Directory members keep insertion order; when two members normalize to
//!   the same name the first one wins.
//! - Rosters are de-duplicated by exact username (first occurrence wins) and
//!   stably sorted by rank, unranked players last in input order.
//!
//! Everything except [`DirectoryCache::ensure_fresh`] is pure and
//! synchronous. Time is always passed in by the caller.

mod builder;
mod directory;
mod matcher;
mod normalize;
mod types;

pub use builder::build_roster;
pub use directory::{DirectoryCache, DirectoryError, DirectorySource, EnsureFresh, RefreshOutcome};
pub use matcher::{match_name, NameMatch};
pub use normalize::{normalize_name, strip_org_prefix, strip_suffix_tags, KeyKind, TagPatterns};
pub use types::*;
