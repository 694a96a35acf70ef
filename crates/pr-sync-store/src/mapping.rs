//! `WorkflowItem` <-> SQLite row mapping. All timestamps are stored as
//! ISO-8601 UTC text; all booleans as `INTEGER` 0/1 (spec.md §4.4).

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use pr_sync_types::{
    Action, DispatchMarkers, ItemId, ItemKind, ReviewDecision, Status, WorkflowItem,
};
use rusqlite::Row;
use std::collections::HashMap;

pub fn status_to_str(status: Status) -> &'static str {
    status.as_str()
}

pub fn status_from_str(raw: &str) -> Result<Status, StoreError> {
    let s = match raw {
        "open" => Status::Open,
        "in_progress" => Status::InProgress,
        "pr_created" => Status::PrCreated,
        "closed" => Status::Closed,
        "pending_review" => Status::PendingReview,
        "changes_requested" => Status::ChangesRequested,
        "approved" => Status::Approved,
        "merged" => Status::Merged,
        "conflicting" => Status::Conflicting,
        "checks_failing" => Status::ChecksFailing,
        other => return Err(StoreError::Corrupt(format!("unknown status {other}"))),
    };
    Ok(s)
}

pub fn action_to_str(action: Action) -> &'static str {
    action.as_str()
}

pub fn action_from_str(raw: &str) -> Result<Action, StoreError> {
    let a = match raw {
        "none" => Action::None,
        "needs_dev" => Action::NeedsDev,
        "needs_review" => Action::NeedsReview,
        "needs_fix" => Action::NeedsFix,
        "needs_conflict_resolution" => Action::NeedsConflictResolution,
        "needs_status_fix" => Action::NeedsStatusFix,
        "ready_to_merge" => Action::ReadyToMerge,
        "max_iterations_reached" => Action::MaxIterationsReached,
        other => return Err(StoreError::Corrupt(format!("unknown action {other}"))),
    };
    Ok(a)
}

pub fn kind_to_str(kind: ItemKind) -> &'static str {
    kind.as_str()
}

pub fn kind_from_str(raw: &str) -> Result<ItemKind, StoreError> {
    match raw {
        "issue" => Ok(ItemKind::Issue),
        "pr" => Ok(ItemKind::Pr),
        other => Err(StoreError::Corrupt(format!("unknown kind {other}"))),
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw}: {e}")))
}

/// Read one `workflow_items` row into a `WorkflowItem`.
pub fn row_to_item(row: &Row) -> rusqlite::Result<WorkflowItem> {
    let id_str: String = row.get("id")?;
    let kind_str: String = row.get("kind")?;
    let repo: String = row.get("repo")?;
    let number: i64 = row.get("number")?;
    let labels_json: String = row.get("labels_json")?;
    let reviews_json: String = row.get("reviews_json")?;
    let status_str: String = row.get("status")?;
    let action_str: String = row.get("action")?;

    let kind = kind_from_str(&kind_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
    let status = status_from_str(&status_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
    let action = action_from_str(&action_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

    let labels: Vec<String> = serde_json::from_str(&labels_json).unwrap_or_default();
    let reviews_raw: HashMap<String, String> = serde_json::from_str(&reviews_json).unwrap_or_default();
    let reviews: HashMap<String, ReviewDecision> = reviews_raw
        .into_iter()
        .map(|(k, v)| (k, ReviewDecision::parse(&v)))
        .collect();

    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let last_sync: String = row.get("last_sync")?;

    let lock_expires: Option<String> = row.get("lock_expires")?;

    Ok(WorkflowItem {
        id: ItemId::new(&repo, kind, number as u64),
        kind,
        repo,
        number: number as u64,
        title: row.get("title")?,
        author: row.get("author")?,
        labels,
        github_state: row.get("github_state")?,
        created_at: parse_timestamp(&created_at).unwrap_or_else(|_| Utc::now()),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(|_| Utc::now()),
        last_sync: parse_timestamp(&last_sync).unwrap_or_else(|_| Utc::now()),
        status,
        action,
        head_sha: row.get("head_sha")?,
        head_ref_name: row.get("head_ref_name")?,
        last_reviewed_sha: row.get("last_reviewed_sha")?,
        reviews,
        all_reviewers_approved: row.get::<_, i64>("all_reviewers_approved")? != 0,
        any_changes_requested: row.get::<_, i64>("any_changes_requested")? != 0,
        sha_matches_review: row.get::<_, i64>("sha_matches_review")? != 0,
        has_conflicts: row.get::<_, i64>("has_conflicts")? != 0,
        dispatch_markers: DispatchMarkers {
            review: row.get("last_review_dispatch_sha")?,
            fix: row.get("last_fix_dispatch_sha")?,
            merge: row.get("last_merge_dispatch_sha")?,
            conflict: row.get("last_conflict_dispatch_sha")?,
            status_fix: row.get("last_status_fix_dispatch_sha")?,
        },
        iteration: row.get::<_, i64>("iteration")? as u32,
        max_iterations: row.get::<_, i64>("max_iterations")? as u32,
        assigned_agent: row.get("assigned_agent")?,
        lock_expires: lock_expires.and_then(|s| parse_timestamp(&s).ok()),
        priority: row.get("priority")?,
        status_check_rollup: row.get("status_check_rollup")?,
        last_head_sha_seen: row.get("last_head_sha_seen")?,
    })
}
