//! Long-running tick loop (spec.md §4.5-§4.7, §7 "Propagation
//! policy"): alternates Sync and Dispatch passes on a fixed interval,
//! isolating per-repo/per-item failures so the next tick always gets a
//! chance to retry. Generalizes the teacher's single-shot TUI refresh
//! into a persistent async service.

use pr_sync_agent::ProcessAgentSpawner;
use pr_sync_config::EngineConfig;
use pr_sync_github::OctocrabReader;
use pr_sync_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Wall-clock gap between the end of one sync+dispatch cycle and the
/// start of the next. No fixed cadence is mandated by spec.md; this
/// balances API courtesy against dispatch latency for a bot fleet.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg!(debug_assertions) {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn tick_interval() -> Duration {
    std::env::var("PR_SYNC_TICK_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}

/// Process identity recorded against the `sync` advisory lock so two
/// daemon instances never run a pass concurrently (spec.md §4.4).
fn owner_id() -> String {
    format!("pr-sync-daemon:{}", std::process::id())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(EngineConfig::load());
    let db_path = pr_sync_config::paths::default_db_path()?;
    info!(db = %db_path.display(), "opening durable store");
    let store = Arc::new(Store::open(&db_path)?);

    let token = std::env::var("GH_TOKEN")
        .or_else(|_| std::env::var("GITHUB_TOKEN"))
        .map_err(|_| anyhow::anyhow!("GH_TOKEN or GITHUB_TOKEN must be set"))?;
    let client = octocrab::Octocrab::builder()
        .personal_token(token)
        .build()?;
    let reader: Arc<dyn pr_sync_github::GitHubReader> = Arc::new(OctocrabReader::new(client));

    let spawner = ProcessAgentSpawner::new(config.agent_spawn.binary.clone());
    let owner = owner_id();
    let interval = tick_interval();

    info!(interval_secs = interval.as_secs(), "starting tick loop");

    loop {
        let repos: Vec<String> = config
            .repos
            .keys()
            .filter(|repo| config.is_repo_enabled(repo))
            .cloned()
            .collect();

        if repos.is_empty() {
            warn!("no enabled repos configured; idling");
        } else {
            match pr_sync_engine::run_sync_pass(
                Arc::clone(&store),
                Arc::clone(&config),
                Arc::clone(&reader),
                &repos,
                &owner,
            )
            .await
            {
                Ok(summary) => {
                    info!(
                        repos_synced = summary.repos_synced,
                        items_synced = summary.items_synced,
                        reconciled = summary.reconciled,
                        errors = summary.errors.len(),
                        lock_held_elsewhere = summary.lock_held_elsewhere,
                        "sync pass complete"
                    );
                }
                Err(err) => {
                    // Every repo in the pass failed; the pass itself
                    // still terminated cleanly, so the next tick retries.
                    error!(code = ?err.code, message = %err.message, "sync pass failed entirely");
                }
            }

            let summary =
                pr_sync_engine::run_dispatch_pass(&store, &config, &db_path.display().to_string(), &spawner)
                    .await;
            info!(
                dispatched = summary.dispatched,
                failed = summary.failed,
                skipped_cap = summary.skipped_cap,
                "dispatch pass complete"
            );
        }

        tokio::time::sleep(interval).await;
    }
}
