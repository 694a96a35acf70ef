//! The Durable Store (spec.md §4.4): a single-file, single-writer
//! SQLite-backed store for `WorkflowItem`s, advisory locks, and the
//! append-only audit trails.

use crate::error::StoreError;
use crate::mapping::{action_to_str, kind_to_str, row_to_item, status_to_str};
use crate::schema::run_migrations;
use chrono::{DateTime, Duration, Utc};
use pr_sync_types::{Action, ActionKind, DispatchEvent, ItemId, ItemKind, SyncLogEntry, WorkflowItem};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Filters for `Store::list_items` (spec.md §4.4 enumeration).
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub kind: Option<ItemKind>,
    pub action: Option<Action>,
    pub github_state: Option<String>,
    /// `max_iterations_reached` queries filter on `iteration >=
    /// max_iterations` rather than an `action` column match.
    pub iteration_at_or_above_max: bool,
}

/// Single-file relational store. `rusqlite`'s `Connection` is not
/// `Sync`, so concurrent access from multiple async tasks is
/// serialized behind an internal mutex — callers on the async side
/// drive it through `tokio::task::spawn_blocking` (spec.md §5).
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Store, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, for tests and the `doctor` CLI dry-run.
    pub fn open_in_memory() -> Result<Store, StoreError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    pub fn upsert_item(&self, item: &WorkflowItem) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let labels_json = serde_json::to_string(&item.labels)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let reviews_json = serde_json::to_string(
            &item
                .reviews
                .iter()
                .map(|(k, v)| (k.clone(), v.as_str_for_storage()))
                .collect::<std::collections::HashMap<_, _>>(),
        )
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO workflow_items (
                id, kind, repo, number, title, author, labels_json, github_state,
                created_at, updated_at, last_sync, status, action,
                head_sha, head_ref_name, last_reviewed_sha, reviews_json,
                all_reviewers_approved, any_changes_requested, sha_matches_review, has_conflicts,
                last_review_dispatch_sha, last_fix_dispatch_sha, last_merge_dispatch_sha,
                last_conflict_dispatch_sha, last_status_fix_dispatch_sha,
                iteration, max_iterations, assigned_agent, lock_expires,
                priority, status_check_rollup, last_head_sha_seen
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21,
                ?22, ?23, ?24,
                ?25, ?26,
                ?27, ?28, ?29, ?30,
                ?31, ?32, ?33
            )
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                labels_json = excluded.labels_json,
                github_state = excluded.github_state,
                updated_at = excluded.updated_at,
                last_sync = excluded.last_sync,
                status = excluded.status,
                action = excluded.action,
                head_sha = excluded.head_sha,
                head_ref_name = excluded.head_ref_name,
                last_reviewed_sha = excluded.last_reviewed_sha,
                reviews_json = excluded.reviews_json,
                all_reviewers_approved = excluded.all_reviewers_approved,
                any_changes_requested = excluded.any_changes_requested,
                sha_matches_review = excluded.sha_matches_review,
                has_conflicts = excluded.has_conflicts,
                max_iterations = excluded.max_iterations,
                assigned_agent = excluded.assigned_agent,
                lock_expires = excluded.lock_expires,
                priority = excluded.priority,
                status_check_rollup = excluded.status_check_rollup,
                last_head_sha_seen = excluded.last_head_sha_seen
            "#,
            params![
                item.id.as_str(),
                kind_to_str(item.kind),
                item.repo,
                item.number as i64,
                item.title,
                item.author,
                labels_json,
                item.github_state,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
                item.last_sync.to_rfc3339(),
                status_to_str(item.status),
                action_to_str(item.action),
                item.head_sha,
                item.head_ref_name,
                item.last_reviewed_sha,
                reviews_json,
                item.all_reviewers_approved as i64,
                item.any_changes_requested as i64,
                item.sha_matches_review as i64,
                item.has_conflicts as i64,
                item.dispatch_markers.review,
                item.dispatch_markers.fix,
                item.dispatch_markers.merge,
                item.dispatch_markers.conflict,
                item.dispatch_markers.status_fix,
                item.iteration as i64,
                item.max_iterations as i64,
                item.assigned_agent,
                item.lock_expires.map(|t| t.to_rfc3339()),
                item.priority,
                item.status_check_rollup,
                item.last_head_sha_seen,
            ],
        )?;
        Ok(())
    }

    pub fn get_item(&self, id: &ItemId) -> Result<Option<WorkflowItem>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare("SELECT * FROM workflow_items WHERE id = ?1")?;
        let mut rows = stmt.query(params![id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_item(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_items(&self, filter: ItemFilter) -> Result<Vec<WorkflowItem>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut sql = String::from("SELECT * FROM workflow_items WHERE 1 = 1");
        let mut bindings: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            bindings.push(Box::new(kind_to_str(kind).to_string()));
        }
        if filter.iteration_at_or_above_max {
            sql.push_str(" AND iteration >= max_iterations");
        } else if let Some(action) = filter.action {
            sql.push_str(" AND action = ?");
            bindings.push(Box::new(action_to_str(action).to_string()));
        }
        if let Some(state) = &filter.github_state {
            sql.push_str(" AND lower(github_state) = lower(?)");
            bindings.push(Box::new(state.clone()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = bindings.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), row_to_item)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Sweep expired rows for `name`, then insert if no unexpired row
    /// exists (spec.md §4.4).
    pub fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "DELETE FROM locks WHERE name = ?1 AND expires_at <= ?2",
            params![name, now.to_rfc3339()],
        )?;
        let expires_at = now + ttl;
        let changed = conn.execute(
            "INSERT INTO locks (name, owner, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO NOTHING",
            params![name, owner, expires_at.to_rfc3339()],
        )?;
        Ok(changed == 1)
    }

    pub fn release_lock(&self, name: &str, owner: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            "DELETE FROM locks WHERE name = ?1 AND owner = ?2",
            params![name, owner],
        )?;
        Ok(changed > 0)
    }

    pub fn cleanup_expired_locks(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            "DELETE FROM locks WHERE expires_at <= ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(changed)
    }

    /// Atomically set the dispatch marker for `action` to `revision`,
    /// and — for `ActionKind::Fix` only — increment `iteration` in the
    /// same transaction (spec.md §4.4, "Atomic iteration increment").
    pub fn mark_dispatched(&self, id: &ItemId, action: ActionKind, revision: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction()?;
        let column = match action {
            ActionKind::Review => "last_review_dispatch_sha",
            ActionKind::Fix => "last_fix_dispatch_sha",
            ActionKind::Merge => "last_merge_dispatch_sha",
            ActionKind::Conflict => "last_conflict_dispatch_sha",
            ActionKind::StatusFix => "last_status_fix_dispatch_sha",
            ActionKind::Dev => {
                // `dev` has no dedupe column of its own (spec.md §3
                // only lists five marker columns); nothing to persist
                // beyond the dispatch_events audit row.
                tx.commit()?;
                return Ok(());
            }
        };
        tx.execute(
            &format!("UPDATE workflow_items SET {column} = ?1 WHERE id = ?2"),
            params![revision, id.as_str()],
        )?;
        if matches!(action, ActionKind::Fix) {
            tx.execute(
                "UPDATE workflow_items SET iteration = iteration + 1 WHERE id = ?1",
                params![id.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let errors_json =
            serde_json::to_string(&entry.errors).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        conn.execute(
            "INSERT INTO sync_log (started_at, finished_at, repos_synced, items_synced, errors_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.started_at.to_rfc3339(),
                entry.finished_at.to_rfc3339(),
                entry.repos_synced,
                entry.items_synced,
                errors_json,
            ],
        )?;
        Ok(())
    }

    pub fn append_dispatch_event(&self, event: &DispatchEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let outcome = match event.outcome {
            pr_sync_types::DispatchOutcome::Success => "success",
            pr_sync_types::DispatchOutcome::Failure => "failure",
        };
        conn.execute(
            "INSERT INTO dispatch_events (item_id, action, revision, agent, outcome, timestamp, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.item_id,
                event.action,
                event.revision,
                event.agent,
                outcome,
                event.timestamp.to_rfc3339(),
                event.detail,
            ],
        )?;
        Ok(())
    }
}

// Small helper so `reviews_json` can round-trip `ReviewDecision`
// through its canonical string form without depending on serde's
// derived (enum-tagged) JSON shape, which would break the original's
// plain `{login: "APPROVED"}` map shape consumed by `get_open_prs.py`-
// style tooling.
trait ReviewDecisionStorage {
    fn as_str_for_storage(&self) -> String;
}

impl ReviewDecisionStorage for pr_sync_types::ReviewDecision {
    fn as_str_for_storage(&self) -> String {
        match self {
            pr_sync_types::ReviewDecision::Approved => "APPROVED".to_string(),
            pr_sync_types::ReviewDecision::ChangesRequested => "CHANGES_REQUESTED".to_string(),
            pr_sync_types::ReviewDecision::Commented => "COMMENTED".to_string(),
            pr_sync_types::ReviewDecision::Other => "OTHER".to_string(),
        }
    }
}

