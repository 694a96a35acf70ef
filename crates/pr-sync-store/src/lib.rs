//! The Durable Store (spec.md §4.4): SQLite-backed persistence of
//! `WorkflowItem` rows, advisory locks, and append-only audit trails.
//! One process writes; cross-process safety is via the `sync`
//! advisory lock with TTL (spec.md §9).

mod error;
mod mapping;
mod schema;
mod store;

pub use error::StoreError;
pub use store::{ItemFilter, Store};
