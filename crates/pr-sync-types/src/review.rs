//! Review observation and evaluation types for `pr_sync_core::evaluator`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A reviewer's decision on a single review submission. String
/// comparisons against upstream GitHub casing are always
/// case-insensitive (spec.md §4.1), so this is parsed once at the
/// adapter boundary and never re-compared as a raw string downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    Commented,
    Other,
}

impl ReviewDecision {
    /// Parse GitHub's review state string (`APPROVED`, `CHANGES_REQUESTED`,
    /// `COMMENTED`, `DISMISSED`, ...), case-insensitively.
    pub fn parse(raw: &str) -> ReviewDecision {
        if raw.eq_ignore_ascii_case("approved") {
            ReviewDecision::Approved
        } else if raw.eq_ignore_ascii_case("changes_requested") {
            ReviewDecision::ChangesRequested
        } else if raw.eq_ignore_ascii_case("commented") {
            ReviewDecision::Commented
        } else {
            ReviewDecision::Other
        }
    }
}

/// One observed review event as fetched from GitHub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewObservation {
    pub author_login: String,
    pub decision: ReviewDecision,
    pub revision: String,
    pub submitted_at: DateTime<Utc>,
}

/// Optional approval policy overriding the legacy "everyone approves"
/// rule (spec.md §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub min_approvals: Option<u32>,
    pub required_logins: HashSet<String>,
    pub veto_logins: HashSet<String>,
}

/// Output of `evaluate_reviews` (spec.md §4.1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewEvaluation {
    pub all_required_approved: bool,
    pub any_changes_requested: bool,
    pub latest_review_sha: Option<String>,
    pub latest_decision_by_reviewer: HashMap<String, ReviewDecision>,
}
