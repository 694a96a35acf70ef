//! Raw upstream observations fed into `pr_sync_core::state_machine`.
//!
//! These mirror the shape the GitHub GraphQL/REST adapters hand back
//! (`state`, `headRefOid`, `mergeable`, `mergeStateStatus`, `reviews`)
//! rather than our own computed model, so the state machine's input is
//! exactly what was observed this pass.

use crate::review::ReviewObservation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mergeability as reported by GitHub (`MERGEABLE`, `CONFLICTING`,
/// `UNKNOWN`), compared case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mergeable {
    Mergeable,
    Conflicting,
    Unknown,
}

impl Mergeable {
    pub fn parse(raw: &str) -> Mergeable {
        if raw.eq_ignore_ascii_case("mergeable") {
            Mergeable::Mergeable
        } else if raw.eq_ignore_ascii_case("conflicting") {
            Mergeable::Conflicting
        } else {
            Mergeable::Unknown
        }
    }
}

/// Upstream merge status rollup (`CLEAN`, `DIRTY`, `UNSTABLE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStateStatus {
    Clean,
    Dirty,
    Unstable,
    Other,
}

impl MergeStateStatus {
    pub fn parse(raw: &str) -> MergeStateStatus {
        if raw.eq_ignore_ascii_case("clean") {
            MergeStateStatus::Clean
        } else if raw.eq_ignore_ascii_case("dirty") {
            MergeStateStatus::Dirty
        } else if raw.eq_ignore_ascii_case("unstable") {
            MergeStateStatus::Unstable
        } else {
            MergeStateStatus::Other
        }
    }
}

/// Upstream PR open/closed/merged state string (`OPEN`, `CLOSED`, `MERGED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamState {
    Open,
    Closed,
    Merged,
}

impl UpstreamState {
    pub fn parse(raw: &str) -> UpstreamState {
        if raw.eq_ignore_ascii_case("merged") {
            UpstreamState::Merged
        } else if raw.eq_ignore_ascii_case("closed") {
            UpstreamState::Closed
        } else {
            UpstreamState::Open
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamState::Open => "open",
            UpstreamState::Closed => "closed",
            UpstreamState::Merged => "merged",
        }
    }
}

/// One pull request as observed this sync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrObservation {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub state: UpstreamState,
    pub head_sha: String,
    pub head_ref_name: Option<String>,
    pub mergeable: Mergeable,
    pub merge_state: MergeStateStatus,
    pub status_check_rollup: Option<String>,
    pub reviews: Vec<ReviewObservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: Option<String>,
}

/// One issue as observed this sync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueObservation {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
