//! Reviewer roster lookup, grounded on
//! `original_source/github/workflow_config.py::load_reviewers_for_repo`:
//! per-repo file, then a global default file, then a hardcoded
//! fallback — whichever is the first to list at least one reviewer.

use crate::paths;
use serde::Deserialize;

const FALLBACK_REVIEWERS: &[&str] = &["default-reviewer-a", "default-reviewer-b"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerConfig {
    pub login: String,
    pub agent: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ReviewerEntry {
    name: String,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ReviewerFile {
    #[serde(default)]
    reviewers: Vec<ReviewerEntry>,
}

fn read_reviewer_file(path: &std::path::Path) -> Option<Vec<ReviewerConfig>> {
    let content = std::fs::read_to_string(path).ok()?;
    let parsed: ReviewerFile = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("failed to parse reviewer file {}: {err}", path.display());
            return None;
        }
    };
    let enabled: Vec<ReviewerConfig> = parsed
        .reviewers
        .into_iter()
        .filter(|r| r.enabled)
        .map(|r| ReviewerConfig {
            login: r.name,
            agent: r.agent,
            enabled: true,
        })
        .collect();
    if enabled.is_empty() {
        None
    } else {
        Some(enabled)
    }
}

/// Loads enabled reviewers for `repo` ("owner/name"), falling through
/// the per-repo file, the global default file, and finally the
/// hardcoded fallback list.
pub fn load_reviewers_for_repo(repo: &str) -> Vec<ReviewerConfig> {
    if let Ok(path) = paths::reviewers_path_for_repo(repo) {
        if let Some(reviewers) = read_reviewer_file(&path) {
            return reviewers;
        }
    }
    if let Ok(path) = paths::default_reviewers_path() {
        if let Some(reviewers) = read_reviewer_file(&path) {
            return reviewers;
        }
    }
    FALLBACK_REVIEWERS
        .iter()
        .map(|login| ReviewerConfig {
            login: login.to_string(),
            agent: None,
            enabled: true,
        })
        .collect()
}
