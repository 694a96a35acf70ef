use chrono::{Duration, Utc};
use pr_sync_store::{ItemFilter, Store};
use pr_sync_types::{
    Action, ActionKind, DispatchEvent, DispatchMarkers, DispatchOutcome, ItemId, ItemKind, Status,
    SyncLogEntry, WorkflowItem,
};
use std::collections::HashMap;
use tempfile::tempdir;

fn sample_item(number: u64, action: Action) -> WorkflowItem {
    let now = Utc::now();
    WorkflowItem {
        id: ItemId::new("owner/repo", ItemKind::Pr, number),
        kind: ItemKind::Pr,
        repo: "owner/repo".into(),
        number,
        title: "Add feature".into(),
        author: Some("dev1".into()),
        labels: vec!["backend".into()],
        github_state: "open".into(),
        created_at: now,
        updated_at: now,
        last_sync: now,
        status: Status::PendingReview,
        action,
        head_sha: Some("sha1".into()),
        head_ref_name: Some("feature-branch".into()),
        last_reviewed_sha: None,
        reviews: HashMap::new(),
        all_reviewers_approved: false,
        any_changes_requested: false,
        sha_matches_review: false,
        has_conflicts: false,
        dispatch_markers: DispatchMarkers::default(),
        iteration: 0,
        max_iterations: 5,
        assigned_agent: None,
        lock_expires: None,
        priority: 0,
        status_check_rollup: None,
        last_head_sha_seen: None,
    }
}

#[test]
fn upsert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let item = sample_item(1, Action::NeedsReview);
    store.upsert_item(&item).unwrap();

    let loaded = store.get_item(&item.id).unwrap().unwrap();
    assert_eq!(loaded.id, item.id);
    assert_eq!(loaded.title, "Add feature");
    assert_eq!(loaded.action, Action::NeedsReview);
    assert_eq!(loaded.head_sha.as_deref(), Some("sha1"));
}

#[test]
fn upsert_is_idempotent_update() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let mut item = sample_item(2, Action::NeedsReview);
    store.upsert_item(&item).unwrap();

    item.action = Action::ReadyToMerge;
    item.all_reviewers_approved = true;
    store.upsert_item(&item).unwrap();

    let loaded = store.get_item(&item.id).unwrap().unwrap();
    assert_eq!(loaded.action, Action::ReadyToMerge);
    assert!(loaded.all_reviewers_approved);

    let all = store.list_items(ItemFilter::default()).unwrap();
    assert_eq!(all.len(), 1, "upsert must not duplicate rows");
}

#[test]
fn list_items_filters_by_action() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    store.upsert_item(&sample_item(1, Action::NeedsReview)).unwrap();
    store.upsert_item(&sample_item(2, Action::ReadyToMerge)).unwrap();
    store.upsert_item(&sample_item(3, Action::NeedsReview)).unwrap();

    let filter = ItemFilter {
        action: Some(Action::NeedsReview),
        ..Default::default()
    };
    let matched = store.list_items(filter).unwrap();
    assert_eq!(matched.len(), 2);
}

#[test]
fn list_items_max_iterations_filter_ignores_action_column() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let mut stuck = sample_item(1, Action::MaxIterationsReached);
    stuck.iteration = 5;
    stuck.max_iterations = 5;
    store.upsert_item(&stuck).unwrap();

    let mut not_stuck = sample_item(2, Action::NeedsFix);
    not_stuck.iteration = 2;
    not_stuck.max_iterations = 5;
    store.upsert_item(&not_stuck).unwrap();

    let filter = ItemFilter {
        kind: Some(ItemKind::Pr),
        iteration_at_or_above_max: true,
        ..Default::default()
    };
    let matched = store.list_items(filter).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, stuck.id);
}

#[test]
fn acquire_lock_refuses_while_unexpired() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let now = Utc::now();

    assert!(store
        .acquire_lock("sync", "worker-a", Duration::minutes(10), now)
        .unwrap());
    assert!(!store
        .acquire_lock("sync", "worker-b", Duration::minutes(10), now)
        .unwrap());
}

#[test]
fn acquire_lock_sweeps_expired_rows_first() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let now = Utc::now();

    assert!(store
        .acquire_lock("sync", "worker-a", Duration::seconds(-1), now)
        .unwrap());
    // worker-a's lock already expired relative to `now`; acquire should sweep it.
    assert!(store
        .acquire_lock("sync", "worker-b", Duration::minutes(10), now)
        .unwrap());
}

#[test]
fn release_lock_only_matching_owner() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let now = Utc::now();
    store
        .acquire_lock("sync", "worker-a", Duration::minutes(10), now)
        .unwrap();

    assert!(!store.release_lock("sync", "worker-b").unwrap());
    assert!(store.release_lock("sync", "worker-a").unwrap());
    assert!(store
        .acquire_lock("sync", "worker-b", Duration::minutes(10), now)
        .unwrap());
}

#[test]
fn cleanup_expired_locks_removes_stale_rows() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let now = Utc::now();
    store
        .acquire_lock("sync", "worker-a", Duration::seconds(-5), now)
        .unwrap();
    let removed = store.cleanup_expired_locks(now).unwrap();
    assert_eq!(removed, 1);
}

#[test]
fn mark_dispatched_fix_increments_iteration_atomically() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let item = sample_item(1, Action::NeedsFix);
    store.upsert_item(&item).unwrap();

    store.mark_dispatched(&item.id, ActionKind::Fix, "sha1").unwrap();

    let loaded = store.get_item(&item.id).unwrap().unwrap();
    assert_eq!(loaded.iteration, 1);
    assert_eq!(loaded.dispatch_markers.fix.as_deref(), Some("sha1"));
}

#[test]
fn mark_dispatched_review_does_not_touch_iteration() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let item = sample_item(1, Action::NeedsReview);
    store.upsert_item(&item).unwrap();

    store.mark_dispatched(&item.id, ActionKind::Review, "sha1").unwrap();

    let loaded = store.get_item(&item.id).unwrap().unwrap();
    assert_eq!(loaded.iteration, 0);
    assert_eq!(loaded.dispatch_markers.review.as_deref(), Some("sha1"));
}

#[test]
fn sync_log_and_dispatch_events_append() {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("wf.db")).unwrap();
    let now = Utc::now();

    store
        .append_sync_log(&SyncLogEntry {
            id: None,
            started_at: now,
            finished_at: now,
            repos_synced: 2,
            items_synced: 10,
            errors: vec![],
        })
        .unwrap();

    store
        .append_dispatch_event(&DispatchEvent {
            id: None,
            item_id: "owner/repo#pr#1".into(),
            action: "review".into(),
            revision: "sha1".into(),
            agent: "code-snob".into(),
            outcome: DispatchOutcome::Success,
            timestamp: now,
            detail: None,
        })
        .unwrap();
}

#[test]
fn migrations_are_idempotent_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wf.db");
    {
        let store = Store::open(&path).unwrap();
        store.upsert_item(&sample_item(1, Action::NeedsReview)).unwrap();
    }
    // Reopening re-runs migrations against an already-migrated file.
    let store = Store::open(&path).unwrap();
    let items = store.list_items(ItemFilter::default()).unwrap();
    assert_eq!(items.len(), 1);
}
