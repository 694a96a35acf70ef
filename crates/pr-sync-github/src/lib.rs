//! GitHub collaborator adapter (spec.md §4.8): reader and writer
//! traits plus `octocrab`-backed implementations. Interfaces only from
//! the engine's perspective — tests substitute fakes.

mod credential;
mod error;
mod reader;
mod writer;

pub use credential::{scoped_octocrab, CredentialContext};
pub use error::{format_octocrab_error, GithubError};
pub use reader::{GitHubReader, OctocrabReader, GITHUB_TIMEOUT, PAGE_SIZE};
pub use writer::{
    validate_review_body, CreatePrRequest, GitHubWriter, MergeStrategy, OctocrabWriter,
    ReviewVerdict,
};
