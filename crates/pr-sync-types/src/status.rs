//! Closed enums for computed `Status` and `Action` (spec.md §3, §9
//! "closed enums over strings").

use serde::{Deserialize, Serialize};

/// Computed lifecycle position of an item. Issue and PR variants share
/// one enum so the store can hold either kind in a single column; the
/// state machine only ever produces the subset valid for the item's
/// `ItemKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    // Issue statuses
    Open,
    InProgress,
    PrCreated,
    // Shared
    Closed,
    // PR statuses
    PendingReview,
    ChangesRequested,
    Approved,
    Merged,
    Conflicting,
    ChecksFailing,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::PrCreated => "pr_created",
            Status::Closed => "closed",
            Status::PendingReview => "pending_review",
            Status::ChangesRequested => "changes_requested",
            Status::Approved => "approved",
            Status::Merged => "merged",
            Status::Conflicting => "conflicting",
            Status::ChecksFailing => "checks_failing",
        }
    }
}

/// Next-action directive for an item, drawn from the closed enum in
/// spec.md §3. `Action::None` means "nothing dispatchable this pass".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    None,
    NeedsDev,
    NeedsReview,
    NeedsFix,
    NeedsConflictResolution,
    NeedsStatusFix,
    ReadyToMerge,
    MaxIterationsReached,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::NeedsDev => "needs_dev",
            Action::NeedsReview => "needs_review",
            Action::NeedsFix => "needs_fix",
            Action::NeedsConflictResolution => "needs_conflict_resolution",
            Action::NeedsStatusFix => "needs_status_fix",
            Action::ReadyToMerge => "ready_to_merge",
            Action::MaxIterationsReached => "max_iterations_reached",
        }
    }

    /// Parse a queue-query `action` string (spec.md §6.3 / §4.6). Only
    /// the subset of actions that are ever dispatch-queued are valid
    /// here; `none` is a computation result, never a query target.
    pub fn parse_queue_action(raw: &str) -> Option<Action> {
        match raw {
            "needs_review" => Some(Action::NeedsReview),
            "needs_fix" => Some(Action::NeedsFix),
            "needs_conflict_resolution" => Some(Action::NeedsConflictResolution),
            "needs_status_fix" => Some(Action::NeedsStatusFix),
            "ready_to_merge" => Some(Action::ReadyToMerge),
            "max_iterations_reached" => Some(Action::MaxIterationsReached),
            "needs_dev" => Some(Action::NeedsDev),
            _ => None,
        }
    }

    /// The dispatch-marker / persona kind this action maps to, or
    /// `None` for actions that never get dispatched (`None`,
    /// `MaxIterationsReached`).
    pub fn dispatch_kind(&self) -> Option<ActionKind> {
        match self {
            Action::NeedsReview => Some(ActionKind::Review),
            Action::NeedsFix => Some(ActionKind::Fix),
            Action::NeedsConflictResolution => Some(ActionKind::Conflict),
            Action::NeedsStatusFix => Some(ActionKind::StatusFix),
            Action::ReadyToMerge => Some(ActionKind::Merge),
            Action::NeedsDev => Some(ActionKind::Dev),
            Action::None | Action::MaxIterationsReached => None,
        }
    }
}

/// The dispatch-marker dimension an action belongs to — one dedupe
/// column and one queue per variant (spec.md §4.3, §4.6, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Review,
    Fix,
    Merge,
    Conflict,
    StatusFix,
    Dev,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Review => "review",
            ActionKind::Fix => "fix",
            ActionKind::Merge => "merge",
            ActionKind::Conflict => "conflict",
            ActionKind::StatusFix => "status_fix",
            ActionKind::Dev => "dev",
        }
    }

    /// Dispatch pass order from spec.md §4.7: merge before fix before
    /// conflict before status_fix before review before dev.
    pub const DISPATCH_ORDER: [ActionKind; 6] = [
        ActionKind::Merge,
        ActionKind::Fix,
        ActionKind::Conflict,
        ActionKind::StatusFix,
        ActionKind::Review,
        ActionKind::Dev,
    ];
}
