//! Shared domain types for the pr-sync workspace: the `WorkflowItem`
//! aggregate, its computed `Status`/`Action` enums, review/observation
//! shapes consumed by `pr-sync-core`, and the stable error codes used
//! by every other crate (spec.md §3, §7).

pub mod audit;
pub mod error;
pub mod ids;
pub mod item;
pub mod observation;
pub mod review;
pub mod status;

pub use audit::{DispatchEvent, DispatchOutcome, Lock, SyncLogEntry};
pub use error::{EngineError, ErrorCode};
pub use ids::{ItemId, ItemKind};
pub use item::{DispatchMarkers, WorkflowItem};
pub use observation::{
    IssueObservation, Mergeable, MergeStateStatus, PrObservation, UpstreamState,
};
pub use review::{ApprovalPolicy, ReviewDecision, ReviewEvaluation, ReviewObservation};
pub use status::{Action, ActionKind, Status};
