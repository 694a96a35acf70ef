mod error;
mod spawner;

pub use error::AgentError;
pub use spawner::{
    AgentSpawner, CleanupPolicy, ProcessAgentSpawner, SpawnHandle, SpawnRequest,
    DEFAULT_RUN_TIMEOUT,
};
