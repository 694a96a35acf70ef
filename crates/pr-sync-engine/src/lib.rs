//! The sync/dispatch engine built on top of `pr_sync_core`'s pure
//! functions: the Sync Engine (§4.5), Queue Query Layer (§4.6), and
//! Dispatch Scheduler (§4.7).

pub mod dispatch;
pub mod persona;
pub mod prompt;
pub mod queue;
pub mod sync;

pub use dispatch::{run_dispatch_pass, run_dispatch_pass_with_prompt, DispatchSummary};
pub use persona::{suggest_agent, PersonaStrategy, TitleLabelHeuristic};
pub use prompt::{PromptBuilder, ScaffoldPromptBuilder};
pub use queue::{parse_action, run_queue_query, QueueItem, QueueQuery, QueueResult};
pub use sync::{run_sync_pass, SyncSummary};
