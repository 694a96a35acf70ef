//! GitHub reader adapter (spec.md §4.8): `fetch_open_issues`,
//! `fetch_open_prs`, `fetch_pr_detail`. Interface only from the
//! engine's point of view — these are the only I/O points the Sync
//! Engine touches on the read side.

use crate::error::{format_octocrab_error, GithubError};
use async_trait::async_trait;
use octocrab::Octocrab;
use pr_sync_types::{
    IssueObservation, MergeStateStatus, Mergeable, PrObservation, ReviewDecision,
    ReviewObservation, UpstreamState,
};
use std::time::Duration;

/// Bounded page size for list endpoints (spec.md §4.5 "bounded page").
pub const PAGE_SIZE: u8 = 100;
/// Deadline for every outbound GitHub call (spec.md §5).
pub const GITHUB_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait GitHubReader: Send + Sync {
    async fn fetch_open_issues(&self, repo: &str) -> Result<Vec<IssueObservation>, GithubError>;
    async fn fetch_open_prs(&self, repo: &str) -> Result<Vec<PrObservation>, GithubError>;
    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> Result<PrObservation, GithubError>;
}

pub struct OctocrabReader {
    client: Octocrab,
}

impl OctocrabReader {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    fn split_repo(repo: &str) -> Result<(&str, &str), GithubError> {
        repo.split_once('/')
            .ok_or_else(|| GithubError::Api(anyhow::anyhow!("malformed repo slug: {repo}")))
    }

    async fn with_deadline<T>(
        fut: impl std::future::Future<Output = Result<T, octocrab::Error>>,
    ) -> Result<T, GithubError> {
        tokio::time::timeout(GITHUB_TIMEOUT, fut)
            .await
            .map_err(|_| GithubError::Timeout(GITHUB_TIMEOUT))?
            .map_err(format_octocrab_error)
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ReviewObservation>, GithubError> {
        let page = Self::with_deadline(
            self.client
                .pulls(owner, repo)
                .list_reviews(number)
                .per_page(PAGE_SIZE)
                .send(),
        )
        .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|review| {
                let author_login = review.user.as_ref().map(|u| u.login.clone())?;
                let decision = review_state_to_decision(review.state?);
                let submitted_at = review.submitted_at?;
                Some(ReviewObservation {
                    author_login,
                    decision,
                    revision: review.commit_id.unwrap_or_default(),
                    submitted_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl GitHubReader for OctocrabReader {
    async fn fetch_open_issues(&self, repo: &str) -> Result<Vec<IssueObservation>, GithubError> {
        let (owner, name) = Self::split_repo(repo)?;
        let page = Self::with_deadline(
            self.client
                .issues(owner, name)
                .list()
                .state(octocrab::params::State::Open)
                .per_page(PAGE_SIZE)
                .send(),
        )
        .await?;

        Ok(page
            .items
            .into_iter()
            // the issues list endpoint also returns PRs; those are
            // handled exclusively by fetch_open_prs.
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| IssueObservation {
                repo: repo.to_string(),
                number: issue.number,
                title: issue.title,
                author: Some(issue.user.login),
                labels: issue.labels.into_iter().map(|l| l.name).collect(),
                closed: false,
                created_at: issue.created_at,
                updated_at: issue.updated_at,
            })
            .collect())
    }

    async fn fetch_open_prs(&self, repo: &str) -> Result<Vec<PrObservation>, GithubError> {
        let (owner, name) = Self::split_repo(repo)?;
        let page = Self::with_deadline(
            self.client
                .pulls(owner, name)
                .list()
                .state(octocrab::params::State::Open)
                .per_page(PAGE_SIZE)
                .send(),
        )
        .await?;

        let mut observations = Vec::with_capacity(page.items.len());
        for pr in page.items {
            let number = pr.number;
            let reviews = self.fetch_reviews(owner, name, number).await?;
            observations.push(pr_to_observation(repo, pr, reviews));
        }
        Ok(observations)
    }

    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> Result<PrObservation, GithubError> {
        let (owner, name) = Self::split_repo(repo)?;
        let pr = Self::with_deadline(self.client.pulls(owner, name).get(number)).await?;
        let reviews = self.fetch_reviews(owner, name, number).await?;
        Ok(pr_to_observation(repo, pr, reviews))
    }
}

/// Convert octocrab's `ReviewState` enum to our own, mirroring the
/// teacher's `convert_mergeable_state`-style explicit match rather than
/// relying on `Debug` (which renders Rust variant names, not GitHub's
/// `SCREAMING_SNAKE_CASE` wire values `ReviewDecision::parse` expects).
fn review_state_to_decision(state: octocrab::models::pulls::ReviewState) -> ReviewDecision {
    use octocrab::models::pulls::ReviewState as RS;
    match state {
        RS::Approved => ReviewDecision::Approved,
        RS::ChangesRequested => ReviewDecision::ChangesRequested,
        RS::Commented => ReviewDecision::Commented,
        _ => ReviewDecision::Other,
    }
}

/// Convert octocrab's `MergeableState` enum to a string understood by
/// `MergeStateStatus::parse`, mirroring the teacher's
/// `convert_mergeable_state` (`gh-client::octocrab_client`).
fn mergeable_state_to_str(state: &octocrab::models::pulls::MergeableState) -> &'static str {
    use octocrab::models::pulls::MergeableState as MS;
    match state {
        MS::Clean => "clean",
        MS::Dirty => "dirty",
        MS::Unstable => "unstable",
        MS::Behind => "behind",
        MS::Blocked => "blocked",
        MS::Unknown => "unknown",
        _ => "unknown",
    }
}

fn pr_to_observation(
    repo: &str,
    pr: octocrab::models::pulls::PullRequest,
    reviews: Vec<ReviewObservation>,
) -> PrObservation {
    let state = match (pr.merged_at.is_some(), pr.state) {
        (true, _) => UpstreamState::Merged,
        (false, Some(octocrab::models::IssueState::Closed)) => UpstreamState::Closed,
        _ => UpstreamState::Open,
    };
    let mergeable = match pr.mergeable {
        Some(true) => Mergeable::Mergeable,
        Some(false) => Mergeable::Conflicting,
        None => Mergeable::Unknown,
    };
    let merge_state_str = pr.mergeable_state.as_ref().map(mergeable_state_to_str);
    let merge_state = merge_state_str
        .map(MergeStateStatus::parse)
        .unwrap_or(MergeStateStatus::Other);

    PrObservation {
        repo: repo.to_string(),
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        author: pr.user.as_ref().map(|u| u.login.clone()),
        labels: pr
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.name)
            .collect(),
        state,
        head_sha: pr.head.sha,
        head_ref_name: Some(pr.head.ref_field),
        mergeable,
        merge_state,
        status_check_rollup: merge_state_str.map(|s| s.to_string()),
        reviews,
        created_at: pr.created_at.unwrap_or_default(),
        updated_at: pr.updated_at.unwrap_or_default(),
        body: pr.body,
    }
}
