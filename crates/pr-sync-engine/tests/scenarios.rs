//! End-to-end scenario tests (spec.md §8) driving fake `GitHubReader`/
//! `AgentSpawner` implementations through sync + dispatch passes
//! against a real (tempfile-backed) `Store`. The individual sync- and
//! dispatch-pass mechanics already have unit coverage in
//! `src/sync.rs`/`src/dispatch.rs`; these tests exercise the full
//! sync → dispatch → sync loop so the dedupe and iteration-cap
//! contracts hold across repeated passes, not just within one.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pr_sync_agent::{AgentError, AgentSpawner, SpawnHandle, SpawnRequest};
use pr_sync_config::EngineConfig;
use pr_sync_engine::{run_dispatch_pass, run_sync_pass};
use pr_sync_github::{GitHubReader, GithubError};
use pr_sync_store::Store;
use pr_sync_types::{
    Action, IssueObservation, ItemId, ItemKind, MergeStateStatus, Mergeable, PrObservation,
    ReviewDecision, ReviewObservation, Status, UpstreamState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FakeReader {
    prs: Mutex<Vec<PrObservation>>,
}

#[async_trait]
impl GitHubReader for FakeReader {
    async fn fetch_open_issues(&self, _repo: &str) -> Result<Vec<IssueObservation>, GithubError> {
        Ok(vec![])
    }
    async fn fetch_open_prs(&self, repo: &str) -> Result<Vec<PrObservation>, GithubError> {
        Ok(self
            .prs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.repo == repo)
            .cloned()
            .collect())
    }
    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> Result<PrObservation, GithubError> {
        self.prs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.repo == repo && p.number == number)
            .cloned()
            .ok_or_else(|| GithubError::Api(anyhow::anyhow!("not found")))
    }
}

impl FakeReader {
    fn set(&self, pr: PrObservation) {
        let mut prs = self.prs.lock().unwrap();
        prs.retain(|p| !(p.repo == pr.repo && p.number == pr.number));
        prs.push(pr);
    }
}

fn base_pr(repo: &str, number: u64, head_sha: &str) -> PrObservation {
    PrObservation {
        repo: repo.to_string(),
        number,
        title: "Add widget".into(),
        author: Some("dev".into()),
        labels: vec![],
        state: UpstreamState::Open,
        head_sha: head_sha.to_string(),
        head_ref_name: Some("feature".into()),
        mergeable: Mergeable::Mergeable,
        merge_state: MergeStateStatus::Clean,
        status_check_rollup: None,
        reviews: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
        body: None,
    }
}

fn review(author: &str, decision: ReviewDecision, sha: &str) -> ReviewObservation {
    ReviewObservation {
        author_login: author.to_string(),
        decision,
        revision: sha.to_string(),
        submitted_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

struct AlwaysSucceeds {
    calls: AtomicUsize,
}

#[async_trait]
impl AgentSpawner for AlwaysSucceeds {
    async fn spawn(&self, req: SpawnRequest) -> Result<SpawnHandle, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SpawnHandle {
            label: req.label,
            success: true,
        })
    }
}

/// Scenario 3 (spec.md §8): dedupe idempotence. A sync pass computes
/// `needs_review`, the dispatcher marks it dispatched at the current
/// head sha; the *next* sync pass (same head) must suppress the
/// action back to `none`, and a new commit must re-arm it.
#[tokio::test]
async fn dedupe_idempotence_across_sync_and_dispatch_passes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(&dir.path().join("wf.db")).unwrap());
    let config = Arc::new(EngineConfig::default());
    let reader = Arc::new(FakeReader {
        prs: Mutex::new(vec![base_pr("o/r", 1, "sha3")]),
    });

    run_sync_pass(
        Arc::clone(&store),
        Arc::clone(&config),
        Arc::clone(&reader) as Arc<dyn GitHubReader>,
        &["o/r".to_string()],
        "pass1",
    )
    .await
    .unwrap();
    let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.action, Action::NeedsReview);

    let spawner = AlwaysSucceeds {
        calls: AtomicUsize::new(0),
    };
    let summary = run_dispatch_pass(&store, &config, "test.db", &spawner).await;
    assert_eq!(summary.dispatched, 1);

    // Same head sha, next sync pass: dedupe must suppress back to none.
    run_sync_pass(
        Arc::clone(&store),
        Arc::clone(&config),
        Arc::clone(&reader) as Arc<dyn GitHubReader>,
        &["o/r".to_string()],
        "pass2",
    )
    .await
    .unwrap();
    let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.action, Action::None);

    let summary = run_dispatch_pass(&store, &config, "test.db", &spawner).await;
    assert_eq!(summary.dispatched, 0, "deduped action must not be redispatched");

    // New commit: dedupe re-arms.
    reader.set(base_pr("o/r", 1, "sha4"));
    run_sync_pass(
        Arc::clone(&store),
        Arc::clone(&config),
        Arc::clone(&reader) as Arc<dyn GitHubReader>,
        &["o/r".to_string()],
        "pass3",
    )
    .await
    .unwrap();
    let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.action, Action::NeedsReview);
}

/// Scenario 4 (spec.md §8): fix-loop cap. With `max_iterations = 3`,
/// three successful fix dispatches exhaust the cap; the fourth
/// `needs_fix` computation is replaced by `max_iterations_reached` and
/// no further fix dispatch occurs.
#[tokio::test]
async fn fix_loop_cap_halts_after_max_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(&dir.path().join("wf.db")).unwrap());
    let mut cfg = EngineConfig::default();
    cfg.default_max_iterations = 3;
    cfg.required_reviewers = vec!["architect".to_string()];
    let config = Arc::new(cfg);

    let spawner = AlwaysSucceeds {
        calls: AtomicUsize::new(0),
    };

    for round in 1..=4u32 {
        let sha = format!("sha{round}");
        let changes_requested = base_pr("o/r", 1, &sha)
            .with_review(review("architect", ReviewDecision::ChangesRequested, &sha));
        let reader: Arc<dyn GitHubReader> = Arc::new(FakeReader {
            prs: Mutex::new(vec![changes_requested]),
        });
        run_sync_pass(
            Arc::clone(&store),
            Arc::clone(&config),
            reader,
            &["o/r".to_string()],
            &format!("owner{round}"),
        )
        .await
        .unwrap();

        let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
        if round <= 3 {
            assert_eq!(item.action, Action::NeedsFix, "round {round}");
        } else {
            assert_eq!(item.action, Action::MaxIterationsReached, "round {round}");
        }

        run_dispatch_pass(&store, &config, "test.db", &spawner).await;
    }

    let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.iteration, 3, "iteration must not exceed the cap");
    assert_eq!(spawner.calls.load(Ordering::SeqCst), 3, "no fix dispatch beyond the cap");
}

/// Scenario 5 (spec.md §8): conflict precedence. A PR approved by all
/// required reviewers but reported `mergeable = conflicting` must
/// route to `needs_conflict_resolution`, never `ready_to_merge`; once
/// the conflict clears on a new head sha, it falls back to
/// `needs_review` (the new sha has no matching review yet).
#[tokio::test]
async fn conflict_takes_precedence_over_ready_to_merge() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(&dir.path().join("wf.db")).unwrap());
    let mut cfg = EngineConfig::default();
    cfg.required_reviewers = vec!["architect".to_string()];
    let config = Arc::new(cfg);

    let mut conflicting = base_pr("o/r", 1, "sha1").with_review(review(
        "architect",
        ReviewDecision::Approved,
        "sha1",
    ));
    conflicting.mergeable = Mergeable::Conflicting;
    let reader: Arc<dyn GitHubReader> = Arc::new(FakeReader {
        prs: Mutex::new(vec![conflicting]),
    });
    run_sync_pass(Arc::clone(&store), Arc::clone(&config), reader, &["o/r".to_string()], "pass1")
        .await
        .unwrap();
    let item = store.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.status, Status::Conflicting);
    assert_eq!(item.action, Action::NeedsConflictResolution);

    let resolved = base_pr("o/r", 1, "sha5");
    let reader2: Arc<dyn GitHubReader> = Arc::new(FakeReader {
        prs: Mutex::new(vec![resolved]),
    });
    run_sync_pass(store, config, reader2, &["o/r".to_string()], "pass2")
        .await
        .unwrap();
    let item_after = Store::open(&dir.path().join("wf.db")).unwrap();
    let item = item_after.get_item(&ItemId::new("o/r", ItemKind::Pr, 1)).unwrap().unwrap();
    assert_eq!(item.status, Status::PendingReview);
    assert_eq!(item.action, Action::NeedsReview);
}

trait WithReview {
    fn with_review(self, review: ReviewObservation) -> Self;
}

impl WithReview for PrObservation {
    fn with_review(mut self, review: ReviewObservation) -> Self {
        self.reviews.push(review);
        self
    }
}
