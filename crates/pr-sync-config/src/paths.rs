//! XDG path resolution via `dirs`, with a current-directory override for
//! the engine config file so a repo checkout can ship its own
//! `pr-sync.toml` without touching the user's home directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "pr-sync";
const LOCAL_CONFIG_FILE: &str = "pr-sync.toml";

pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn local_config_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(LOCAL_CONFIG_FILE))
}

pub fn global_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join("workflow.db"))
}

pub fn reviewers_path_for_repo(repo: &str) -> Result<PathBuf> {
    let mut dir = config_dir()?.join("reviewers");
    for segment in repo.split('/') {
        dir = dir.join(segment);
    }
    Ok(dir.join("reviewers.json"))
}

pub fn default_reviewers_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("reviewers").join("default.json"))
}
