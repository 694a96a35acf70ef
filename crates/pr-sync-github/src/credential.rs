//! Per-agent credential isolation (spec.md §4.8, §9 "Credential
//! isolation"). Write-side adapters must be attributable to the
//! intended identity, so each agent gets its own scoped token rather
//! than sharing ambient credentials.

use octocrab::Octocrab;
use std::path::PathBuf;

/// Resolves a per-agent credential directory and token, pure w.r.t.
/// `agent_id` — grounded on
/// `original_source/tools/submit_pr_review.py::reviewer_gh_config_dir`,
/// which derives a deterministic `~/.openclaw/agents/{id}/agent` path
/// from `reviewer_id` alone (no prompt/runtime override).
#[derive(Debug, Clone)]
pub struct CredentialContext {
    pub agent_id: String,
    pub config_dir: Option<PathBuf>,
    pub token: String,
}

impl CredentialContext {
    /// Deterministic lookup: `~/.config/pr-sync/agents/{agent_id}/` if
    /// it exists, else `None` so the caller falls back to whatever
    /// ambient token env resolution already provides.
    pub fn resolve(agent_id: &str, token: String) -> CredentialContext {
        let candidate = dirs::home_dir().map(|home| {
            home.join(".config")
                .join("pr-sync")
                .join("agents")
                .join(agent_id)
        });
        let config_dir = candidate.filter(|p| p.is_dir());
        CredentialContext {
            agent_id: agent_id.to_string(),
            config_dir,
            token,
        }
    }
}

/// Build an `Octocrab` client scoped to `ctx`. Ambient `GH_TOKEN`/
/// `GITHUB_TOKEN` are never read here — the Python equivalent's
/// `env.pop("GH_TOKEN", None)` / `env.pop("GITHUB_TOKEN", None)` dance
/// is achieved simply by never touching `std::env` for the token at
/// all; the token always comes from `ctx.token`, explicitly resolved
/// by the caller.
pub fn scoped_octocrab(ctx: &CredentialContext) -> anyhow::Result<Octocrab> {
    Octocrab::builder()
        .personal_token(ctx.token.clone())
        .build()
        .map_err(Into::into)
}
