//! Queue Query Layer (spec.md §4.6): read-side projections serving
//! dispatchable items to the scheduler, ordered by updated_at
//! ascending, then priority descending, then id ascending. Grounded
//! directly on `original_source/github/get_open_prs.py::run`.

use crate::persona::suggest_agent;
use chrono::Utc;
use pr_sync_config::{load_reviewers_for_repo, EngineConfig};
use pr_sync_store::{ItemFilter, Store};
use pr_sync_types::{Action, ActionKind, EngineError, ErrorCode, ItemKind, WorkflowItem};
use std::collections::HashMap;

/// `original_source/github/get_open_prs.py::MAX_LIMIT`.
pub const MAX_LIMIT: u32 = 200;
pub const DEFAULT_LIMIT: u32 = 20;

fn action_dispatch_type(action: Action) -> &'static str {
    // Mirrors `DISPATCH_TYPE_MAP`; `max_iterations_reached` has no
    // dispatch kind of its own (it is never itself dispatched) so it
    // maps to the original's "alert" sentinel.
    action
        .dispatch_kind()
        .map(|k| k.as_str())
        .unwrap_or("alert")
}

fn action_item_kind(action: Action) -> ItemKind {
    match action {
        Action::NeedsDev => ItemKind::Issue,
        _ => ItemKind::Pr,
    }
}

/// Input envelope (spec.md §4.6, §6.3).
#[derive(Debug, Clone)]
pub struct QueueQuery {
    pub action: Action,
    pub repos: Option<Vec<String>>,
    pub limit: u32,
    pub exclude_already_dispatched: bool,
    pub exclude_claimed: bool,
    pub include_meta: bool,
    pub include_suggested_dev_agent: bool,
}

/// Actions that default `include_suggested_dev_agent` to true, mirroring
/// `_DEV_AGENT_DEFAULT_ACTIONS` in the original.
fn dev_agent_default_actions(action: Action) -> bool {
    matches!(
        action,
        Action::NeedsFix | Action::NeedsConflictResolution | Action::NeedsDev
    )
}

impl QueueQuery {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            repos: None,
            limit: DEFAULT_LIMIT,
            exclude_already_dispatched: true,
            exclude_claimed: true,
            include_meta: true,
            include_suggested_dev_agent: dev_agent_default_actions(action),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    pub fn with_repos(mut self, repos: Vec<String>) -> Self {
        self.repos = Some(repos);
        self
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueItem {
    pub item_id: String,
    pub kind: ItemKind,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    pub head_sha: Option<String>,
    pub head_ref_name: Option<String>,
    pub status: String,
    pub dispatch_type: String,
    pub has_conflicts: Option<bool>,
    pub all_reviewers_approved: Option<bool>,
    pub any_changes_requested: Option<bool>,
    pub last_reviewed_sha: Option<String>,
    pub iteration: Option<u32>,
    pub reviewers: Option<Vec<String>>,
    pub suggested_dev_agent: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueCounts {
    pub scanned: usize,
    pub eligible: usize,
    pub returned: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueFilters {
    pub requested_repos: Option<Vec<String>>,
    pub effective_repos: Vec<String>,
    pub limit: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueResult {
    pub generated_at: chrono::DateTime<Utc>,
    pub source: String,
    pub queue: String,
    pub filters: QueueFilters,
    pub counts: QueueCounts,
    pub items: Vec<QueueItem>,
}

fn effective_repos(query: &QueueQuery, config: &EngineConfig) -> Vec<String> {
    match &query.repos {
        Some(repos) => {
            let mut sorted: Vec<String> = repos.iter().cloned().collect();
            sorted.sort();
            sorted.dedup();
            sorted
        }
        None => {
            let mut enabled: Vec<String> = config
                .repos
                .iter()
                .filter(|(_, rule)| rule.enabled)
                .map(|(repo, _)| repo.clone())
                .collect();
            enabled.sort();
            enabled
        }
    }
}

/// Run one queue projection against the store (spec.md §4.6).
///
/// `source` is a label for the envelope's `source` field (e.g. the DB
/// path) — purely informational, never parsed.
pub fn run_queue_query(
    store: &Store,
    config: &EngineConfig,
    source: &str,
    query: &QueueQuery,
) -> Result<QueueResult, EngineError> {
    let effective = effective_repos(query, config);

    let filter = if query.action == Action::MaxIterationsReached {
        ItemFilter {
            kind: Some(ItemKind::Pr),
            iteration_at_or_above_max: true,
            github_state: Some("open".to_string()),
            ..Default::default()
        }
    } else {
        ItemFilter {
            kind: Some(action_item_kind(query.action)),
            action: Some(query.action),
            github_state: Some("open".to_string()),
            ..Default::default()
        }
    };

    let rows = store.list_items(filter).map_err(EngineError::from)?;
    let scanned = rows.len();

    let now = Utc::now();
    let mut reviewers_cache: HashMap<String, Vec<String>> = HashMap::new();
    let mut eligible: Vec<(WorkflowItem, String, i64)> = Vec::new();

    for item in rows {
        if !effective.is_empty() && !effective.contains(&item.repo) {
            continue;
        }

        if query.exclude_already_dispatched {
            if let Some(kind) = item.action.dispatch_kind() {
                if let (Some(marker), Some(head)) =
                    (item.dispatch_markers.get(kind), item.head_sha.as_deref())
                {
                    if marker == head {
                        continue;
                    }
                }
            }
        }

        if query.exclude_claimed && item.is_claimed(now) {
            continue;
        }

        let repo_priority = config
            .repos
            .get(&item.repo)
            .map(|r| r.priority as i64)
            .unwrap_or(0);
        let priority = item.priority + repo_priority;
        let sort_updated = item.updated_at.to_rfc3339();
        eligible.push((item, sort_updated, priority));
    }

    // updated_at ASC, priority DESC, id ASC (spec.md §4.6).
    eligible.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then(b.2.cmp(&a.2))
            .then(a.0.id.as_str().cmp(b.0.id.as_str()))
    });

    let eligible_count = eligible.len();
    let truncated: Vec<WorkflowItem> = eligible
        .into_iter()
        .take(query.limit as usize)
        .map(|(item, _, _)| item)
        .collect();

    let dispatch_type = action_dispatch_type(query.action);
    let mut items = Vec::with_capacity(truncated.len());
    for item in truncated {
        let reviewers = if query.action == Action::NeedsReview {
            let cached = reviewers_cache.entry(item.repo.clone()).or_insert_with(|| {
                load_reviewers_for_repo(&item.repo)
                    .into_iter()
                    .map(|r| r.login)
                    .collect()
            });
            Some(cached.clone())
        } else {
            None
        };

        let suggested_dev_agent = if query.include_suggested_dev_agent {
            Some(suggest_agent(&item.title, &item.labels, &config.default_agent))
        } else {
            None
        };

        items.push(QueueItem {
            item_id: item.id.as_str().to_string(),
            kind: item.kind,
            repo: item.repo.clone(),
            number: item.number,
            title: item.title.clone(),
            author: item.author.clone(),
            head_sha: item.head_sha.clone(),
            head_ref_name: item.head_ref_name.clone(),
            status: item.status.as_str().to_string(),
            dispatch_type: dispatch_type.to_string(),
            has_conflicts: query.include_meta.then_some(item.has_conflicts),
            all_reviewers_approved: query.include_meta.then_some(item.all_reviewers_approved),
            any_changes_requested: query.include_meta.then_some(item.any_changes_requested),
            last_reviewed_sha: query.include_meta.then(|| item.last_reviewed_sha.clone()).flatten(),
            iteration: query.include_meta.then_some(item.iteration),
            reviewers,
            suggested_dev_agent,
        });
    }

    Ok(QueueResult {
        generated_at: now,
        source: source.to_string(),
        queue: query.action.as_str().to_string(),
        filters: QueueFilters {
            requested_repos: query.repos.clone(),
            effective_repos: effective,
            limit: query.limit,
        },
        counts: QueueCounts {
            scanned,
            eligible: eligible_count,
            returned: items.len(),
        },
        items,
    })
}

/// Parse a queue-query action string, mapping unknown values to the
/// `INVALID_INPUT` error envelope (spec.md §6.3).
pub fn parse_action(raw: &str) -> Result<Action, EngineError> {
    Action::parse_queue_action(raw).ok_or_else(|| {
        EngineError::new(
            ErrorCode::InvalidInput,
            format!("invalid action: {raw}"),
        )
    })
}
