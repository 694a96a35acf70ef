use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent process failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("agent run exceeded its {0:?} timeout")]
    Timeout(Duration),
    #[error("agent exited with status {0}")]
    NonZeroExit(i32),
}
