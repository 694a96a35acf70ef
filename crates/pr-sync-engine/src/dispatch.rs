//! Dispatch Scheduler (spec.md §4.7): drains queues in
//! `merge → fix → conflict → status_fix → review → dev` order, invokes
//! the agent-spawn adapter, and records dispatch markers on success.

use crate::persona::suggest_agent;
use crate::prompt::{PromptBuilder, ScaffoldPromptBuilder};
use crate::queue::{run_queue_query, QueueItem, QueueQuery};
use chrono::Utc;
use pr_sync_agent::{AgentSpawner, SpawnRequest};
use pr_sync_config::{load_reviewers_for_repo, EngineConfig};
use pr_sync_store::Store;
use pr_sync_types::{
    Action, ActionKind, DispatchEvent, DispatchOutcome, ItemId, ItemKind,
};
use std::collections::HashMap;
use std::time::Duration;

/// Fallback per-repo cap when neither the repo config nor the caller
/// overrides it.
pub const DEFAULT_MAX_PER_RUN: u32 = 10;
/// How many candidates to pull from the queue layer per action kind
/// before applying the per-repo cap.
const DISPATCH_QUEUE_LIMIT: u32 = 50;

fn action_for_kind(kind: ActionKind) -> Option<Action> {
    match kind {
        ActionKind::Merge => Some(Action::ReadyToMerge),
        ActionKind::Fix => Some(Action::NeedsFix),
        ActionKind::Conflict => Some(Action::NeedsConflictResolution),
        ActionKind::StatusFix => Some(Action::NeedsStatusFix),
        ActionKind::Review => Some(Action::NeedsReview),
        ActionKind::Dev => Some(Action::NeedsDev),
    }
}

fn item_kind_for(kind: ActionKind) -> ItemKind {
    if kind == ActionKind::Dev {
        ItemKind::Issue
    } else {
        ItemKind::Pr
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DispatchSummary {
    pub dispatched: u32,
    pub failed: u32,
    pub skipped_cap: u32,
}

/// Resolve the agent identity a dispatched item should run under:
/// the assigned reviewer for `review`, the persona heuristic otherwise.
fn resolve_agent_id(
    kind: ActionKind,
    item: &QueueItem,
    config: &EngineConfig,
    reviewer_agents: &mut HashMap<String, Vec<(String, Option<String>)>>,
) -> String {
    if kind == ActionKind::Review {
        let roster = reviewer_agents.entry(item.repo.clone()).or_insert_with(|| {
            load_reviewers_for_repo(&item.repo)
                .into_iter()
                .map(|r| (r.login, r.agent))
                .collect()
        });
        if let Some((_, Some(agent))) = roster.iter().find(|(_, agent)| agent.is_some()) {
            return agent.clone();
        }
        if let Some((login, _)) = roster.first() {
            return login.clone();
        }
        config.default_agent.clone()
    } else {
        suggest_agent(&item.title, &[], &config.default_agent)
    }
}

/// Drain every queue in dispatch order, invoking `spawner` for each
/// eligible item and recording the outcome (spec.md §4.7).
pub async fn run_dispatch_pass(
    store: &Store,
    config: &EngineConfig,
    source: &str,
    spawner: &dyn AgentSpawner,
) -> DispatchSummary {
    run_dispatch_pass_with_prompt(store, config, source, spawner, &ScaffoldPromptBuilder).await
}

pub async fn run_dispatch_pass_with_prompt(
    store: &Store,
    config: &EngineConfig,
    source: &str,
    spawner: &dyn AgentSpawner,
    prompts: &dyn PromptBuilder,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    let mut reviewer_agents: HashMap<String, Vec<(String, Option<String>)>> = HashMap::new();

    for kind in ActionKind::DISPATCH_ORDER {
        let Some(action) = action_for_kind(kind) else {
            continue;
        };
        let query = QueueQuery::new(action).with_limit(DISPATCH_QUEUE_LIMIT);
        let result = match run_queue_query(store, config, source, &query) {
            Ok(r) => r,
            Err(err) => {
                log::warn!("dispatch: queue query for {} failed: {}", action.as_str(), err.message);
                continue;
            }
        };

        let mut dispatched_per_repo: HashMap<String, u32> = HashMap::new();

        for item in result.items {
            let cap = config.max_per_run_for(&item.repo, DEFAULT_MAX_PER_RUN);
            let count = dispatched_per_repo.entry(item.repo.clone()).or_insert(0);
            if *count >= cap {
                summary.skipped_cap += 1;
                continue;
            }

            let agent_id = resolve_agent_id(kind, &item, config, &mut reviewer_agents);
            let prompt = prompts.build(kind, &item);
            let label = format!("{}#{}", item.repo, item.number);
            let head_sha = item.head_sha.clone().unwrap_or_default();
            let run_timeout = Duration::from_secs(config.agent_spawn.run_timeout_secs);
            let req = SpawnRequest::new(label.clone(), prompt, agent_id.clone()).with_timeout(run_timeout);

            let item_id = ItemId::new(&item.repo, item_kind_for(kind), item.number);
            match spawner.spawn(req).await {
                Ok(handle) if handle.success => {
                    if let Err(err) = store.mark_dispatched(&item_id, kind, &head_sha) {
                        log::warn!("dispatch: mark_dispatched failed for {item_id}: {err}");
                    }
                    let _ = store.append_dispatch_event(&DispatchEvent {
                        id: None,
                        item_id: item_id.as_str().to_string(),
                        action: action.as_str().to_string(),
                        revision: head_sha,
                        agent: agent_id,
                        outcome: DispatchOutcome::Success,
                        timestamp: Utc::now(),
                        detail: None,
                    });
                    *count += 1;
                    summary.dispatched += 1;
                }
                Ok(_) | Err(_) => {
                    // Dedupe marker is intentionally not written on
                    // failure: the next tick retries automatically
                    // (spec.md §4.7 point 3).
                    let _ = store.append_dispatch_event(&DispatchEvent {
                        id: None,
                        item_id: item_id.as_str().to_string(),
                        action: action.as_str().to_string(),
                        revision: head_sha,
                        agent: agent_id,
                        outcome: DispatchOutcome::Failure,
                        timestamp: Utc::now(),
                        detail: None,
                    });
                    summary.failed += 1;
                }
            }
        }
    }

    summary
}
