mod config;
pub mod paths;
mod reviewers;

pub use config::{AgentSpawnConfig, ApprovalPolicyConfig, EngineConfig, RepoConfig};
pub use reviewers::{load_reviewers_for_repo, ReviewerConfig};
