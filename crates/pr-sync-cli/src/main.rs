//! Diagnostic CLI surface (spec.md §6 "CLI surface", §7 "User-visible
//! failure behaviour"). Each subcommand prints one JSON document to
//! stdout and exits 0 on success / 1 on error with a `{error: {...}}`
//! envelope, mirroring the original's per-tool `argparse` scripts
//! (`original_source/github/get_open_prs.py`, `tools/submit_pr.py`,
//! `tools/submit_pr_review.py`).

use clap::{Parser, Subcommand};
use pr_sync_config::EngineConfig;
use pr_sync_engine::queue::{parse_action, QueueQuery};
use pr_sync_github::{
    CreatePrRequest, CredentialContext, GitHubWriter, MergeStrategy, OctocrabWriter, ReviewVerdict,
};
use pr_sync_store::Store;
use pr_sync_types::{Action, ErrorCode};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pr-sync-cli", about = "pr-sync diagnostic and write-side CLI")]
struct Cli {
    /// Path to the workflow SQLite database. Defaults to the XDG cache path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to an `EngineConfig` TOML file. Defaults to the normal
    /// cwd-then-XDG lookup (`EngineConfig::load`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue projection for the `needs_dev` issue queue (spec.md §4.6).
    GetOpenIssues(QueueArgs),
    /// Queue projection for any PR action queue (spec.md §4.6).
    GetOpenPrs(QueueArgs),
    /// Open a new pull request (spec.md §6 `submit_pr`).
    SubmitPr(SubmitPrArgs),
    /// Submit a review verdict on a pull request (spec.md §6.4).
    SubmitPrReview(SubmitPrReviewArgs),
    /// Merge a pull request (spec.md §4.8 `merge_pr`).
    Merge(MergeArgs),
    /// Sweep expired locks and report store health (supplemental, SPEC_FULL.md §6.5).
    Doctor,
}

#[derive(clap::Args)]
struct QueueArgs {
    /// Action to query. Required for `get-open-prs`; `get-open-issues`
    /// always queries `needs_dev` and ignores this flag if given.
    #[arg(long)]
    action: Option<String>,
    #[arg(long, value_delimiter = ',')]
    repos: Option<Vec<String>>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    include_already_dispatched: bool,
    #[arg(long)]
    include_claimed: bool,
}

#[derive(clap::Args)]
struct SubmitPrArgs {
    #[arg(long)]
    repo: String,
    #[arg(long)]
    head: String,
    #[arg(long, default_value = "main")]
    base: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    body: String,
    #[arg(long)]
    agent_id: String,
    #[arg(long)]
    draft: bool,
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,
}

#[derive(clap::Args)]
struct SubmitPrReviewArgs {
    #[arg(long)]
    repo: String,
    #[arg(long)]
    number: u64,
    #[arg(long, value_enum)]
    verdict: VerdictArg,
    #[arg(long)]
    body: String,
    #[arg(long)]
    agent_id: String,
}

#[derive(Clone, clap::ValueEnum)]
enum VerdictArg {
    Approve,
    RequestChanges,
}

#[derive(clap::Args)]
struct MergeArgs {
    #[arg(long)]
    repo: String,
    #[arg(long)]
    number: u64,
    #[arg(long, value_enum, default_value = "merge")]
    strategy: StrategyArg,
    #[arg(long)]
    agent_id: String,
}

#[derive(Clone, clap::ValueEnum)]
enum StrategyArg {
    Merge,
    Squash,
    Rebase,
}

fn invalid_input(message: impl Into<String>) -> serde_json::Value {
    pr_sync_types::EngineError::new(ErrorCode::InvalidInput, message).to_envelope()
}

/// Resolves the write-side token + credential directory for `agent_id`.
/// The token itself always comes from `GH_TOKEN`/`GITHUB_TOKEN` read
/// once here, never from ambient env lookups deeper in the call stack
/// (spec.md §4.8 "Credential isolation").
fn resolve_credentials(agent_id: &str) -> Result<CredentialContext, serde_json::Value> {
    let token = std::env::var("GH_TOKEN")
        .or_else(|_| std::env::var("GITHUB_TOKEN"))
        .map_err(|_| {
            pr_sync_types::EngineError::new(
                ErrorCode::ConfigError,
                "GH_TOKEN or GITHUB_TOKEN must be set for write operations",
            )
            .to_envelope()
        })?;
    Ok(CredentialContext::resolve(agent_id, token))
}

fn open_store(cli: &Cli) -> Result<Store, serde_json::Value> {
    let path = match &cli.db {
        Some(p) => p.clone(),
        None => pr_sync_config::paths::default_db_path().map_err(|e| {
            pr_sync_types::EngineError::new(ErrorCode::ConfigError, e.to_string()).to_envelope()
        })?,
    };
    Store::open(&path)
        .map_err(|e| pr_sync_types::EngineError::from(e).to_envelope())
}

fn load_config(cli: &Cli) -> EngineConfig {
    match &cli.config {
        Some(path) => std::fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default(),
        None => EngineConfig::load(),
    }
}

fn run_queue(cli: &Cli, args: &QueueArgs, force_action: Option<Action>) -> serde_json::Value {
    let action = match force_action {
        Some(a) => a,
        None => match args.action.as_deref() {
            None => return invalid_input("--action is required"),
            Some(raw) => match parse_action(raw) {
                Ok(a) => a,
                Err(err) => return err.to_envelope(),
            },
        },
    };

    let store = match open_store(cli) {
        Ok(s) => s,
        Err(envelope) => return envelope,
    };
    let config = load_config(cli);

    let mut query = QueueQuery::new(action);
    if let Some(repos) = &args.repos {
        query = query.with_repos(repos.clone());
    }
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    query.exclude_already_dispatched = !args.include_already_dispatched;
    query.exclude_claimed = !args.include_claimed;

    let db_label = cli
        .db
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "default".to_string());

    match pr_sync_engine::queue::run_queue_query(&store, &config, &db_label, &query) {
        Ok(result) => serde_json::to_value(result).unwrap(),
        Err(err) => err.to_envelope(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let (envelope, ok) = match &cli.command {
        Command::GetOpenIssues(args) => (run_queue(&cli, args, Some(Action::NeedsDev)), true),
        Command::GetOpenPrs(args) => (run_queue(&cli, args, None), true),
        Command::SubmitPr(args) => submit_pr(args).await,
        Command::SubmitPrReview(args) => submit_pr_review(args).await,
        Command::Merge(args) => merge(args).await,
        Command::Doctor => doctor(&cli),
    };

    println!("{envelope}");
    let is_error = envelope.get("error").is_some();
    if ok && !is_error {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn submit_pr(args: &SubmitPrArgs) -> (serde_json::Value, bool) {
    let ctx = match resolve_credentials(&args.agent_id) {
        Ok(ctx) => ctx,
        Err(envelope) => return (envelope, false),
    };
    let writer = OctocrabWriter::new();
    let req = CreatePrRequest {
        head: args.head.clone(),
        base: args.base.clone(),
        title: args.title.clone(),
        body: args.body.clone(),
        draft: args.draft,
        labels: args.labels.clone().unwrap_or_default(),
    };
    match writer.create_pr(&ctx, &args.repo, &req).await {
        Ok(number) => (
            serde_json::json!({
                "ok": true,
                "repo": args.repo,
                "number": number,
                "head": args.head,
                "base": args.base,
            }),
            true,
        ),
        Err(err) => (pr_sync_types::EngineError::from(err).to_envelope(), false),
    }
}

async fn submit_pr_review(args: &SubmitPrReviewArgs) -> (serde_json::Value, bool) {
    let ctx = match resolve_credentials(&args.agent_id) {
        Ok(ctx) => ctx,
        Err(envelope) => return (envelope, false),
    };
    let verdict = match args.verdict {
        VerdictArg::Approve => ReviewVerdict::Approve,
        VerdictArg::RequestChanges => ReviewVerdict::RequestChanges,
    };
    let writer = OctocrabWriter::new();
    match writer
        .submit_review(&ctx, &args.repo, args.number, verdict, &args.body)
        .await
    {
        Ok(()) => (
            serde_json::json!({"ok": true, "repo": args.repo, "number": args.number}),
            true,
        ),
        Err(err) => (pr_sync_types::EngineError::from(err).to_envelope(), false),
    }
}

async fn merge(args: &MergeArgs) -> (serde_json::Value, bool) {
    let ctx = match resolve_credentials(&args.agent_id) {
        Ok(ctx) => ctx,
        Err(envelope) => return (envelope, false),
    };
    let strategy = match args.strategy {
        StrategyArg::Merge => MergeStrategy::Merge,
        StrategyArg::Squash => MergeStrategy::Squash,
        StrategyArg::Rebase => MergeStrategy::Rebase,
    };
    let writer = OctocrabWriter::new();
    match writer.merge_pr(&ctx, &args.repo, args.number, strategy).await {
        Ok(()) => (
            serde_json::json!({"ok": true, "repo": args.repo, "number": args.number}),
            true,
        ),
        Err(err) => (pr_sync_types::EngineError::from(err).to_envelope(), false),
    }
}

fn doctor(cli: &Cli) -> (serde_json::Value, bool) {
    let store = match open_store(cli) {
        Ok(s) => s,
        Err(envelope) => return (envelope, false),
    };
    match store.cleanup_expired_locks(chrono::Utc::now()) {
        Ok(swept) => (serde_json::json!({"ok": true, "locks_swept": swept}), true),
        Err(err) => (pr_sync_types::EngineError::from(err).to_envelope(), false),
    }
}
