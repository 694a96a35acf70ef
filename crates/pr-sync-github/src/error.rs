use pr_sync_types::{EngineError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("github api error: {0}")]
    Api(anyhow::Error),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("invalid review body: {0}")]
    InvalidReviewBody(String),
}

impl From<GithubError> for EngineError {
    fn from(err: GithubError) -> Self {
        let code = match &err {
            GithubError::InvalidReviewBody(_) => ErrorCode::InvalidInput,
            GithubError::Api(_) | GithubError::Timeout(_) => ErrorCode::UpstreamFailed,
        };
        EngineError::new(code, err.to_string())
    }
}

/// Format octocrab errors with useful message content.
///
/// The default Display for `octocrab::Error` only shows the variant
/// name (e.g. "GitHub"), which is not helpful; this extracts the
/// actual error message, carried near-verbatim from the teacher's
/// `gh-client::octocrab_client::format_octocrab_error`.
pub fn format_octocrab_error(err: octocrab::Error) -> GithubError {
    let message = match &err {
        octocrab::Error::GitHub { source, .. } => {
            let msg = &source.message;
            let details = source
                .errors
                .as_ref()
                .map(|errs| {
                    errs.iter()
                        .filter_map(|e| e.as_str().or_else(|| e.get("message")?.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|s| !s.is_empty());

            match details {
                Some(d) => format!("{msg}: {d}"),
                None => msg.clone(),
            }
        }
        _ => format!("{err:?}"),
    };
    GithubError::Api(anyhow::anyhow!(message))
}
