//! `WorkflowItem`, the single aggregate (spec.md §3).

use crate::ids::{ItemId, ItemKind};
use crate::review::ReviewDecision;
use crate::status::{Action, ActionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-action dispatch markers: the head revision at which each action
/// kind was last successfully dispatched. `None` means never.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMarkers {
    pub review: Option<String>,
    pub fix: Option<String>,
    pub merge: Option<String>,
    pub conflict: Option<String>,
    pub status_fix: Option<String>,
}

impl DispatchMarkers {
    pub fn get(&self, kind: ActionKind) -> Option<&str> {
        match kind {
            ActionKind::Review => self.review.as_deref(),
            ActionKind::Fix => self.fix.as_deref(),
            ActionKind::Merge => self.merge.as_deref(),
            ActionKind::Conflict => self.conflict.as_deref(),
            ActionKind::StatusFix => self.status_fix.as_deref(),
            ActionKind::Dev => None,
        }
    }

    pub fn set(&mut self, kind: ActionKind, revision: &str) {
        match kind {
            ActionKind::Review => self.review = Some(revision.to_string()),
            ActionKind::Fix => self.fix = Some(revision.to_string()),
            ActionKind::Merge => self.merge = Some(revision.to_string()),
            ActionKind::Conflict => self.conflict = Some(revision.to_string()),
            ActionKind::StatusFix => self.status_fix = Some(revision.to_string()),
            ActionKind::Dev => {}
        }
    }
}

/// The single aggregate. One row per GitHub issue or PR, keyed by
/// [`ItemId`]. Mutated only by the Sync Engine (observed/computed
/// fields) and the Dispatch Scheduler (dispatch markers + iteration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowItem {
    // Identity/meta
    pub id: ItemId,
    pub kind: ItemKind,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub github_state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync: DateTime<Utc>,

    // Computed
    pub status: crate::status::Status,
    pub action: Action,

    // PR-only
    pub head_sha: Option<String>,
    pub head_ref_name: Option<String>,
    pub last_reviewed_sha: Option<String>,
    pub reviews: HashMap<String, ReviewDecision>,
    pub all_reviewers_approved: bool,
    pub any_changes_requested: bool,
    pub sha_matches_review: bool,
    pub has_conflicts: bool,

    // Dedupe markers
    pub dispatch_markers: DispatchMarkers,

    // Iteration
    pub iteration: u32,
    pub max_iterations: u32,

    // Lease/assignment
    pub assigned_agent: Option<String>,
    pub lock_expires: Option<DateTime<Utc>>,

    // Supplemental fields carried from original_source (SPEC_FULL.md §3)
    pub priority: i64,
    pub status_check_rollup: Option<String>,
    pub last_head_sha_seen: Option<String>,
}

impl WorkflowItem {
    /// `sha_matches_review` invariant (spec.md §3 invariant 3).
    pub fn recompute_sha_matches_review(&mut self) {
        self.sha_matches_review = match (&self.last_reviewed_sha, &self.head_sha) {
            (Some(reviewed), Some(head)) => reviewed == head,
            _ => false,
        };
    }

    pub fn is_claimed(&self, now: DateTime<Utc>) -> bool {
        match self.lock_expires {
            Some(expires) => expires > now,
            None => false,
        }
    }
}
