//! Sync Engine (spec.md §4.5): fetch observations from GitHub, run
//! them through the pure core, and persist the result. One pass is
//! exclusive across the whole engine via the `sync` advisory lock.

use chrono::{Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use pr_sync_config::EngineConfig;
use pr_sync_core::{apply_dispatch_dedupe, apply_iteration_gate, determine_issue_action, determine_pr_action};
use pr_sync_github::GitHubReader;
use pr_sync_store::{ItemFilter, Store};
use pr_sync_types::{
    ApprovalPolicy, EngineError, ErrorCode, IssueObservation, ItemId, ItemKind, PrObservation,
    Status, SyncLogEntry, UpstreamState, WorkflowItem,
};
use std::collections::HashSet;
use std::sync::Arc;

/// How long a sync pass holds the `sync` advisory lock before it is
/// considered abandoned and eligible for sweep (spec.md §4.4).
const SYNC_LOCK_TTL: ChronoDuration = ChronoDuration::minutes(10);
/// Bounded concurrency across per-repo fetch+compute tasks (spec.md §5).
const MAX_CONCURRENT_REPOS: usize = 8;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncSummary {
    pub repos_synced: u32,
    pub items_synced: u32,
    pub reconciled: u32,
    pub errors: Vec<String>,
    pub lock_held_elsewhere: bool,
}

/// Converts the config-level policy knob into the core's `ApprovalPolicy`.
/// A config at its defaults (min_approvals = 1, no overrides) maps to
/// `None` so the evaluator falls back to its "every required reviewer
/// approved" rule instead of the quorum rule — only an explicit
/// override switches to quorum/veto semantics.
fn resolve_policy(config: &EngineConfig, repo: &str) -> Option<ApprovalPolicy> {
    let cfg = config.approval_policy_for(repo);
    if cfg.min_approvals <= 1 && cfg.required_reviewers.is_empty() && cfg.veto_powers.is_empty() {
        return None;
    }
    Some(ApprovalPolicy {
        min_approvals: Some(cfg.min_approvals),
        required_logins: cfg.required_reviewers.into_iter().collect(),
        veto_logins: cfg.veto_powers.into_iter().collect(),
    })
}

async fn compute_pr_item(
    store: &Store,
    config: &EngineConfig,
    observation: PrObservation,
) -> Result<WorkflowItem, EngineError> {
    let id = ItemId::new(&observation.repo, ItemKind::Pr, observation.number);
    let prior = store.get_item(&id)?;
    let required = config.required_reviewers_for(&observation.repo);
    let policy = resolve_policy(config, &observation.repo);

    let decision = determine_pr_action(&observation, prior.as_ref(), &required, policy.as_ref());
    let now = Utc::now();

    let mut item = WorkflowItem {
        id,
        kind: ItemKind::Pr,
        repo: observation.repo.clone(),
        number: observation.number,
        title: observation.title,
        author: observation.author,
        labels: observation.labels,
        github_state: "open".to_string(),
        created_at: prior
            .as_ref()
            .map(|p| p.created_at)
            .unwrap_or(observation.created_at),
        updated_at: observation.updated_at,
        last_sync: now,
        status: decision.status,
        action: decision.action,
        head_sha: Some(observation.head_sha.clone()),
        head_ref_name: observation.head_ref_name,
        last_reviewed_sha: decision.last_reviewed_sha,
        reviews: decision.decisions,
        all_reviewers_approved: decision.all_approved,
        any_changes_requested: decision.any_changes_requested,
        sha_matches_review: false,
        has_conflicts: decision.has_conflicts,
        dispatch_markers: prior
            .as_ref()
            .map(|p| p.dispatch_markers.clone())
            .unwrap_or_default(),
        iteration: prior.as_ref().map(|p| p.iteration).unwrap_or(0),
        max_iterations: prior
            .as_ref()
            .map(|p| p.max_iterations)
            .unwrap_or(config.default_max_iterations),
        assigned_agent: prior.as_ref().and_then(|p| p.assigned_agent.clone()),
        lock_expires: prior.as_ref().and_then(|p| p.lock_expires),
        priority: prior.as_ref().map(|p| p.priority).unwrap_or(0),
        status_check_rollup: observation.status_check_rollup,
        last_head_sha_seen: Some(observation.head_sha.clone()),
    };
    item.recompute_sha_matches_review();

    let markers = item.dispatch_markers.clone();
    item.action = apply_dispatch_dedupe(item.action, &observation.head_sha, &markers);
    let (action, _cap_newly_hit) = apply_iteration_gate(item.action, item.iteration, item.max_iterations);
    item.action = action;

    Ok(item)
}

fn compute_issue_item(
    store: &Store,
    config: &EngineConfig,
    observation: IssueObservation,
    open_prs: &[PrObservation],
) -> Result<WorkflowItem, EngineError> {
    let id = ItemId::new(&observation.repo, ItemKind::Issue, observation.number);
    let prior = store.get_item(&id)?;
    let decision = determine_issue_action(&observation, prior.as_ref(), open_prs);
    let now = Utc::now();

    Ok(WorkflowItem {
        id,
        kind: ItemKind::Issue,
        repo: observation.repo,
        number: observation.number,
        title: observation.title,
        author: observation.author,
        labels: observation.labels,
        github_state: "open".to_string(),
        created_at: prior
            .as_ref()
            .map(|p| p.created_at)
            .unwrap_or(observation.created_at),
        updated_at: observation.updated_at,
        last_sync: now,
        status: decision.status,
        action: decision.action,
        head_sha: None,
        head_ref_name: None,
        last_reviewed_sha: None,
        reviews: Default::default(),
        all_reviewers_approved: false,
        any_changes_requested: false,
        sha_matches_review: false,
        has_conflicts: false,
        dispatch_markers: prior
            .as_ref()
            .map(|p| p.dispatch_markers.clone())
            .unwrap_or_default(),
        iteration: 0,
        max_iterations: config.default_max_iterations,
        assigned_agent: prior.as_ref().and_then(|p| p.assigned_agent.clone()),
        lock_expires: prior.as_ref().and_then(|p| p.lock_expires),
        priority: prior.as_ref().map(|p| p.priority).unwrap_or(0),
        status_check_rollup: None,
        last_head_sha_seen: None,
    })
}

/// Fetch+compute one repo's issues and PRs; never returns `Err` for a
/// per-repo upstream failure, so the caller can isolate it from the rest
/// of the pass (spec.md §4.5 "per-repo failure isolation").
async fn sync_one_repo(
    store: &Store,
    config: &EngineConfig,
    reader: &dyn GitHubReader,
    repo: &str,
) -> (usize, usize, Option<String>) {
    let prs = match reader.fetch_open_prs(repo).await {
        Ok(prs) => prs,
        Err(err) => return (0, 0, Some(format!("{repo}: fetch_open_prs failed: {err}"))),
    };
    let issues = match reader.fetch_open_issues(repo).await {
        Ok(issues) => issues,
        Err(err) => return (0, 0, Some(format!("{repo}: fetch_open_issues failed: {err}"))),
    };

    let mut synced = 0usize;
    let mut open_numbers: HashSet<u64> = HashSet::new();

    for pr in &prs {
        open_numbers.insert(pr.number);
        match compute_pr_item(store, config, pr.clone()).await {
            Ok(item) => {
                if let Err(err) = store.upsert_item(&item) {
                    return (synced, 0, Some(format!("{repo}: upsert_item failed: {err}")));
                }
                synced += 1;
            }
            Err(err) => return (synced, 0, Some(format!("{repo}: compute_pr_item failed: {err}"))),
        }
    }

    for issue in issues {
        match compute_issue_item(store, config, issue, &prs) {
            Ok(item) => {
                if let Err(err) = store.upsert_item(&item) {
                    return (synced, 0, Some(format!("{repo}: upsert_item failed: {err}")));
                }
                synced += 1;
            }
            Err(err) => return (synced, 0, Some(format!("{repo}: compute_issue_item failed: {err}"))),
        }
    }

    match reconcile_repo(store, repo, &open_numbers, reader).await {
        Ok(reconciled) => (synced, reconciled, None),
        Err(err) => (synced, 0, Some(format!("{repo}: reconcile failed: {err}"))),
    }
}

/// Rows the store believes are still open for `repo` but that did not
/// come back in this pass's open-PR fetch are re-fetched individually
/// and reconciled to `Merged` or `Closed` (spec.md §9: "if the upstream
/// API returns neither state reliably, default to closed").
async fn reconcile_repo(
    store: &Store,
    repo: &str,
    seen_open_numbers: &HashSet<u64>,
    reader: &dyn GitHubReader,
) -> Result<usize, EngineError> {
    let stored = store.list_items(ItemFilter {
        kind: Some(ItemKind::Pr),
        github_state: Some("open".to_string()),
        ..Default::default()
    })?;

    let mut reconciled = 0;
    for item in stored {
        if item.repo != repo || seen_open_numbers.contains(&item.number) {
            continue;
        }
        let number = item.number;
        let mut updated = item;
        match reader.fetch_pr_detail(repo, number).await {
            Ok(detail) => {
                updated.github_state = match detail.state {
                    UpstreamState::Merged => "merged".to_string(),
                    _ => "closed".to_string(),
                };
                updated.status = match detail.state {
                    UpstreamState::Merged => Status::Merged,
                    _ => Status::Closed,
                };
            }
            Err(_) => {
                // The detail call itself failed (deleted branch, 404,
                // permissions); default to closed per spec.md §9.
                updated.github_state = "closed".to_string();
                updated.status = Status::Closed;
            }
        }
        updated.last_sync = Utc::now();
        store.upsert_item(&updated)?;
        reconciled += 1;
    }
    Ok(reconciled)
}

/// Run one full sync pass across `repos`, guarded by the `sync`
/// advisory lock (spec.md §4.4, §4.5).
pub async fn run_sync_pass(
    store: Arc<Store>,
    config: Arc<EngineConfig>,
    reader: Arc<dyn GitHubReader>,
    repos: &[String],
    owner: &str,
) -> Result<SyncSummary, EngineError> {
    let started_at = Utc::now();
    store.cleanup_expired_locks(started_at)?;

    if !store.acquire_lock("sync", owner, SYNC_LOCK_TTL, started_at)? {
        return Ok(SyncSummary {
            lock_held_elsewhere: true,
            ..Default::default()
        });
    }

    let mut summary = SyncSummary::default();

    let results: Vec<(usize, usize, Option<String>)> = stream::iter(repos.iter().cloned())
        .map(|repo| {
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let reader = Arc::clone(&reader);
            async move { sync_one_repo(&store, &config, reader.as_ref(), &repo).await }
        })
        .buffer_unordered(MAX_CONCURRENT_REPOS)
        .collect()
        .await;

    for (synced, reconciled, error) in results {
        summary.repos_synced += 1;
        summary.items_synced += synced as u32;
        summary.reconciled += reconciled as u32;
        if let Some(err) = error {
            log::warn!("sync: {err}");
            summary.errors.push(err);
        }
    }

    let finished_at = Utc::now();
    store.append_sync_log(&SyncLogEntry {
        id: None,
        started_at,
        finished_at,
        repos_synced: summary.repos_synced,
        items_synced: summary.items_synced,
        errors: summary.errors.clone(),
    })?;
    store.release_lock("sync", owner)?;

    if !summary.errors.is_empty() && summary.errors.len() as u32 == summary.repos_synced {
        return Err(EngineError::new(
            ErrorCode::UpstreamFailed,
            format!("every repo in this pass failed: {:?}", summary.errors),
        ));
    }

    Ok(summary)
}
