//! Engine configuration, loaded once at process start from a TOML
//! file — current directory first, then the XDG config directory —
//! mirroring `AppConfig::load()`'s CWD-then-home lookup order.

use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalPolicyConfig {
    #[serde(default = "default_min_approvals")]
    pub min_approvals: u32,
    #[serde(default)]
    pub required_reviewers: Vec<String>,
    #[serde(default)]
    pub veto_powers: Vec<String>,
}

fn default_min_approvals() -> u32 {
    1
}

impl Default for ApprovalPolicyConfig {
    fn default() -> Self {
        Self {
            min_approvals: default_min_approvals(),
            required_reviewers: Vec::new(),
            veto_powers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSpawnConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_cleanup_policy")]
    pub cleanup_policy: String,
}

fn default_binary() -> String {
    "pr-sync-agent-runner".to_string()
}

fn default_run_timeout_secs() -> u64 {
    600
}

fn default_cleanup_policy() -> String {
    "keep".to_string()
}

impl Default for AgentSpawnConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            run_timeout_secs: default_run_timeout_secs(),
            cleanup_policy: default_cleanup_policy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepoConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    pub max_per_run: Option<u32>,
    pub required_reviewers_override: Option<Vec<String>>,
    pub approval_rules_override: Option<ApprovalPolicyConfig>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub repos: HashMap<String, RepoConfig>,
    #[serde(default = "default_agent")]
    pub default_agent: String,
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,
    #[serde(default)]
    pub required_reviewers: Vec<String>,
    #[serde(default)]
    pub approval_rules: ApprovalPolicyConfig,
    #[serde(default)]
    pub agent_spawn: AgentSpawnConfig,
}

fn default_agent() -> String {
    "backend-dev".to_string()
}

fn default_max_iterations() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repos: HashMap::new(),
            default_agent: default_agent(),
            default_max_iterations: default_max_iterations(),
            required_reviewers: Vec::new(),
            approval_rules: ApprovalPolicyConfig::default(),
            agent_spawn: AgentSpawnConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads from the first of `./pr-sync.toml` or the XDG config
    /// file that exists and parses cleanly; falls back to defaults.
    pub fn load() -> Self {
        for candidate in [paths::local_config_path(), paths::global_config_path()] {
            let Ok(path) = candidate else { continue };
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("loaded engine config from {}", path.display());
                    return config;
                }
                Err(err) => {
                    log::warn!("failed to parse engine config {}: {err}", path.display());
                }
            }
        }
        log::debug!("using default engine config");
        Self::default()
    }

    /// Resolves the effective per-repo approval policy: repo override
    /// if present, else the engine-wide default.
    pub fn approval_policy_for(&self, repo: &str) -> ApprovalPolicyConfig {
        self.repos
            .get(repo)
            .and_then(|r| r.approval_rules_override.clone())
            .unwrap_or_else(|| self.approval_rules.clone())
    }

    /// Resolves the effective required-reviewer list for a repo: repo
    /// override if present, else the engine-wide default.
    pub fn required_reviewers_for(&self, repo: &str) -> Vec<String> {
        self.repos
            .get(repo)
            .and_then(|r| r.required_reviewers_override.clone())
            .unwrap_or_else(|| self.required_reviewers.clone())
    }

    pub fn max_per_run_for(&self, repo: &str, fallback: u32) -> u32 {
        self.repos
            .get(repo)
            .and_then(|r| r.max_per_run)
            .unwrap_or(fallback)
    }

    pub fn is_repo_enabled(&self, repo: &str) -> bool {
        self.repos.get(repo).map(|r| r.enabled).unwrap_or(true)
    }
}
