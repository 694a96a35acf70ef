//! Item identity: `ItemKind` and the `"{repo}#{kind}#{number}"` scoped id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of GitHub items the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Issue,
    Pr,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::Pr => "pr",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `"{repo}#{kind}#{number}"` identity, e.g. `"owner/name#pr#42"`.
///
/// Constructed only via [`ItemId::new`], which guarantees the format
/// invariant from spec.md §3 (invariant 1) holds for every instance in
/// circulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(repo: &str, kind: ItemKind, number: u64) -> Self {
        Self(format!("{repo}#{kind}#{number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the three components back out of an id string.
    ///
    /// Used by the store's row-to-`WorkflowItem` mapping and by CLI
    /// output that needs `repo`/`number` without re-deriving them.
    pub fn parse(raw: &str) -> Option<(String, ItemKind, u64)> {
        let mut parts = raw.rsplitn(3, '#');
        let number: u64 = parts.next()?.parse().ok()?;
        let kind_str = parts.next()?;
        let repo = parts.next()?;
        let kind = match kind_str {
            "issue" => ItemKind::Issue,
            "pr" => ItemKind::Pr,
            _ => return None,
        };
        Some((repo.to_string(), kind, number))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_spec() {
        let id = ItemId::new("miller46/jm-api", ItemKind::Pr, 56);
        assert_eq!(id.as_str(), "miller46/jm-api#pr#56");
        let id = ItemId::new("miller46/jm-api", ItemKind::Issue, 48);
        assert_eq!(id.as_str(), "miller46/jm-api#issue#48");
    }

    #[test]
    fn different_repos_same_number_differ() {
        let a = ItemId::new("alice/foo", ItemKind::Pr, 10);
        let b = ItemId::new("bob/bar", ItemKind::Pr, 10);
        assert_ne!(a, b);
    }

    #[test]
    fn same_repo_different_kind_differ() {
        let issue = ItemId::new("alice/foo", ItemKind::Issue, 10);
        let pr = ItemId::new("alice/foo", ItemKind::Pr, 10);
        assert_ne!(issue, pr);
    }

    #[test]
    fn round_trips_through_parse() {
        let id = ItemId::new("owner/name", ItemKind::Pr, 123);
        let (repo, kind, number) = ItemId::parse(id.as_str()).unwrap();
        assert_eq!(repo, "owner/name");
        assert_eq!(kind, ItemKind::Pr);
        assert_eq!(number, 123);
    }
}
