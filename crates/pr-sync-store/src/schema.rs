//! Additive schema migrations (spec.md §4.4, §6.2).
//!
//! The base schema is created with `CREATE TABLE IF NOT EXISTS`; columns
//! added after the initial cut (the "supplemental fields" SPEC_FULL.md
//! §3 carries over from `original_source`) are applied via guarded
//! `ALTER TABLE ... ADD COLUMN` statements, probing `PRAGMA table_info`
//! first so re-running migrations against an already-migrated database
//! is a no-op. This generalizes `original_source/github/get_open_prs.py`'s
//! `_columns`/`_col` column-probing helper, except migrations run once
//! at startup here rather than being probed at every query (an Open
//! Question from spec.md §9, resolved in DESIGN.md).

use rusqlite::Connection;

use crate::error::StoreError;

const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflow_items (
    id                  TEXT PRIMARY KEY,
    kind                TEXT NOT NULL,
    repo                TEXT NOT NULL,
    number              INTEGER NOT NULL,
    title               TEXT NOT NULL,
    author              TEXT,
    labels_json         TEXT NOT NULL DEFAULT '[]',
    github_state        TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    last_sync           TEXT NOT NULL,
    status              TEXT NOT NULL,
    action              TEXT NOT NULL,
    head_sha            TEXT,
    head_ref_name       TEXT,
    last_reviewed_sha   TEXT,
    reviews_json        TEXT NOT NULL DEFAULT '{}',
    all_reviewers_approved INTEGER NOT NULL DEFAULT 0,
    any_changes_requested  INTEGER NOT NULL DEFAULT 0,
    sha_matches_review     INTEGER NOT NULL DEFAULT 0,
    has_conflicts           INTEGER NOT NULL DEFAULT 0,
    last_review_dispatch_sha TEXT,
    last_fix_dispatch_sha     TEXT,
    last_merge_dispatch_sha   TEXT,
    last_conflict_dispatch_sha TEXT,
    last_status_fix_dispatch_sha TEXT,
    iteration           INTEGER NOT NULL DEFAULT 0,
    max_iterations      INTEGER NOT NULL DEFAULT 5,
    assigned_agent      TEXT,
    lock_expires        TEXT
);

CREATE INDEX IF NOT EXISTS idx_workflow_items_kind_action
    ON workflow_items(kind, action);
CREATE INDEX IF NOT EXISTS idx_workflow_items_repo
    ON workflow_items(repo);

CREATE TABLE IF NOT EXISTS locks (
    name        TEXT PRIMARY KEY,
    owner       TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at      TEXT NOT NULL,
    finished_at     TEXT NOT NULL,
    repos_synced    INTEGER NOT NULL,
    items_synced    INTEGER NOT NULL,
    errors_json     TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS dispatch_events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id     TEXT NOT NULL,
    action      TEXT NOT NULL,
    revision    TEXT NOT NULL,
    agent       TEXT NOT NULL,
    outcome     TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    detail      TEXT
);
CREATE INDEX IF NOT EXISTS idx_dispatch_events_item
    ON dispatch_events(item_id);
"#;

/// Supplemental columns added after the base cut, each guarded so
/// re-running this against an up-to-date database is a no-op.
const SUPPLEMENTAL_COLUMNS: &[(&str, &str)] = &[
    ("priority", "INTEGER NOT NULL DEFAULT 0"),
    ("status_check_rollup", "TEXT"),
    ("last_head_sha_seen", "TEXT"),
];

fn existing_columns(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

fn ensure_column(conn: &Connection, table: &str, column: &str, ddl: &str) -> Result<(), StoreError> {
    let cols = existing_columns(conn, table)?;
    if !cols.iter().any(|c| c == column) {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl}"), [])?;
    }
    Ok(())
}

/// Run all migrations against `conn`. Idempotent: safe to call on
/// every process start.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(BASE_SCHEMA)?;
    for (column, ddl) in SUPPLEMENTAL_COLUMNS {
        ensure_column(conn, "workflow_items", column, ddl)?;
    }
    Ok(())
}
