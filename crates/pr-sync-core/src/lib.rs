//! The pure core of the scheduler: Review Evaluator, State Machine, and
//! Dedupe & Iteration Gate (spec.md §4.1–§4.3). Nothing in this crate
//! performs I/O — every function takes owned/borrowed plain data and
//! returns plain data, enforced at the type level by never taking a
//! `Store`/`GitHubReader`/etc. reference.

pub mod dedupe;
pub mod evaluator;
pub mod state_machine;

pub use dedupe::{apply_dispatch_dedupe, apply_iteration_gate};
pub use evaluator::evaluate_reviews;
pub use state_machine::{body_closes_issue, determine_issue_action, determine_pr_action};

#[cfg(test)]
mod proptests;
