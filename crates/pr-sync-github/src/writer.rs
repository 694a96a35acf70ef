//! GitHub writer adapter (spec.md §4.8, §6.4). `merge_pr` and
//! `submit_review`, executed under a caller-supplied
//! [`CredentialContext`] so writes are attributable to the intended
//! agent identity.

use crate::credential::{scoped_octocrab, CredentialContext};
use crate::error::{format_octocrab_error, GithubError};
use crate::reader::GITHUB_TIMEOUT;
use async_trait::async_trait;
use octocrab::params::pulls::MergeMethod as OctoMergeMethod;

/// Merge strategy (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Merge,
    Squash,
    Rebase,
}

impl From<MergeStrategy> for OctoMergeMethod {
    fn from(value: MergeStrategy) -> Self {
        match value {
            MergeStrategy::Merge => OctoMergeMethod::Merge,
            MergeStrategy::Squash => OctoMergeMethod::Squash,
            MergeStrategy::Rebase => OctoMergeMethod::Rebase,
        }
    }
}

/// Review verdict (spec.md §4.8, §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
}

impl ReviewVerdict {
    fn expected_first_line(&self) -> &'static str {
        match self {
            ReviewVerdict::Approve => "VERDICT: APPROVE",
            ReviewVerdict::RequestChanges => "VERDICT: REQUEST_CHANGES",
        }
    }
}

/// Review body must begin with the literal line `VERDICT: APPROVE` or
/// `VERDICT: REQUEST_CHANGES` for machine-checkability (spec.md §6.4),
/// grounded on `original_source/tools/submit_pr_review.py::validate_body`.
pub fn validate_review_body(verdict: ReviewVerdict, body: &str) -> Result<(), GithubError> {
    if body.trim().is_empty() {
        return Err(GithubError::InvalidReviewBody("body is required".into()));
    }
    let first_line = body
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_uppercase();
    let expected = verdict.expected_first_line();
    if first_line != expected {
        return Err(GithubError::InvalidReviewBody(format!(
            "body must start with '{expected}' for machine-checkable output"
        )));
    }
    Ok(())
}

/// Parameters for opening a new pull request (spec.md §6 `submit_pr`),
/// grounded on `original_source/tools/submit_pr.py::submit_pr`.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub draft: bool,
    pub labels: Vec<String>,
}

#[async_trait]
pub trait GitHubWriter: Send + Sync {
    async fn merge_pr(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        number: u64,
        strategy: MergeStrategy,
    ) -> Result<(), GithubError>;

    /// Opens a new pull request, returning the created PR number.
    /// Label application is best-effort: a failure to attach labels
    /// after a successful create does not fail the call, mirroring
    /// `gh pr create`'s own best-effort `--label` behaviour.
    async fn create_pr(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        req: &CreatePrRequest,
    ) -> Result<u64, GithubError>;

    async fn submit_review(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        number: u64,
        verdict: ReviewVerdict,
        body: &str,
    ) -> Result<(), GithubError>;
}

pub struct OctocrabWriter;

impl OctocrabWriter {
    pub fn new() -> Self {
        Self
    }

    fn split_repo(repo: &str) -> Result<(&str, &str), GithubError> {
        repo.split_once('/')
            .ok_or_else(|| GithubError::Api(anyhow::anyhow!("malformed repo slug: {repo}")))
    }
}

impl Default for OctocrabWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitHubWriter for OctocrabWriter {
    async fn merge_pr(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        number: u64,
        strategy: MergeStrategy,
    ) -> Result<(), GithubError> {
        let (owner, name) = Self::split_repo(repo)?;
        let client = scoped_octocrab(ctx).map_err(GithubError::Api)?;
        tokio::time::timeout(
            GITHUB_TIMEOUT,
            client
                .pulls(owner, name)
                .merge(number)
                .method(strategy.into())
                .send(),
        )
        .await
        .map_err(|_| GithubError::Timeout(GITHUB_TIMEOUT))?
        .map_err(format_octocrab_error)?;
        Ok(())
    }

    async fn create_pr(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        req: &CreatePrRequest,
    ) -> Result<u64, GithubError> {
        let (owner, name) = Self::split_repo(repo)?;
        let client = scoped_octocrab(ctx).map_err(GithubError::Api)?;
        let pr = tokio::time::timeout(
            GITHUB_TIMEOUT,
            client
                .pulls(owner, name)
                .create(&req.title, &req.head, &req.base)
                .body(&req.body)
                .draft(Some(req.draft))
                .send(),
        )
        .await
        .map_err(|_| GithubError::Timeout(GITHUB_TIMEOUT))?
        .map_err(format_octocrab_error)?;

        if !req.labels.is_empty() {
            if let Err(err) = client
                .issues(owner, name)
                .add_labels(pr.number, &req.labels)
                .await
            {
                log::warn!("create_pr: failed to attach labels to {repo}#{}: {err}", pr.number);
            }
        }
        Ok(pr.number)
    }

    async fn submit_review(
        &self,
        ctx: &CredentialContext,
        repo: &str,
        number: u64,
        verdict: ReviewVerdict,
        body: &str,
    ) -> Result<(), GithubError> {
        validate_review_body(verdict, body)?;
        let (owner, name) = Self::split_repo(repo)?;
        let client = scoped_octocrab(ctx).map_err(GithubError::Api)?;
        let event = match verdict {
            ReviewVerdict::Approve => octocrab::params::pulls::ReviewAction::Approve,
            ReviewVerdict::RequestChanges => {
                octocrab::params::pulls::ReviewAction::RequestChanges
            }
        };
        tokio::time::timeout(
            GITHUB_TIMEOUT,
            client
                .pulls(owner, name)
                .reviews(number)
                .create()
                .body(body)
                .event(event)
                .send(),
        )
        .await
        .map_err(|_| GithubError::Timeout(GITHUB_TIMEOUT))?
        .map_err(format_octocrab_error)?;
        Ok(())
    }
}
