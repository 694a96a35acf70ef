//! Property tests for the evaluator's universal invariants (spec.md
//! §8): case-insensitivity, order-independence, comment-immunity.

use crate::evaluator::evaluate_reviews;
use chrono::{TimeZone, Utc};
use pr_sync_types::{ReviewDecision, ReviewObservation};
use proptest::prelude::*;
use std::collections::HashSet;

fn arb_decision() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("APPROVED"),
        Just("approved"),
        Just("Approved"),
        Just("CHANGES_REQUESTED"),
        Just("changes_requested"),
        Just("COMMENTED"),
        Just("commented"),
        Just("DISMISSED"),
    ]
}

fn arb_review(author: &'static str, minute: u32) -> impl Strategy<Value = ReviewObservation> {
    (arb_decision(), "[a-f0-9]{7}").prop_map(move |(decision_str, sha)| ReviewObservation {
        author_login: author.to_string(),
        decision: ReviewDecision::parse(decision_str),
        revision: sha,
        submitted_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, minute % 60, 0).unwrap(),
    })
}

proptest! {
    /// Invariant: decision-string case never changes the verdict.
    #[test]
    fn case_insensitivity_of_decision_strings(raw in arb_decision()) {
        let a = ReviewDecision::parse(raw);
        let b = ReviewDecision::parse(&raw.to_uppercase());
        prop_assert_eq!(a, b);
    }

    /// Invariant: shuffling the input review list never changes the
    /// computed verdict, since the evaluator sorts by submitted_at
    /// before folding.
    #[test]
    fn order_independence(
        r1 in arb_review("alice", 0),
        r2 in arb_review("alice", 1),
        r3 in arb_review("bob", 2),
    ) {
        let required: HashSet<String> = ["alice".to_string(), "bob".to_string()].into_iter().collect();
        let forward = vec![r1.clone(), r2.clone(), r3.clone()];
        let mut backward = forward.clone();
        backward.reverse();

        let ev_forward = evaluate_reviews(&forward, &required, None);
        let ev_backward = evaluate_reviews(&backward, &required, None);

        prop_assert_eq!(ev_forward.all_required_approved, ev_backward.all_required_approved);
        prop_assert_eq!(ev_forward.any_changes_requested, ev_backward.any_changes_requested);
        prop_assert_eq!(ev_forward.latest_review_sha, ev_backward.latest_review_sha);
    }

    /// Invariant: a comment-only review never changes all_required_approved
    /// or any_changes_requested relative to the same list without it.
    #[test]
    fn comment_reviews_never_affect_outcome(
        r1 in arb_review("alice", 0),
        sha in "[a-f0-9]{7}",
    ) {
        let required: HashSet<String> = ["alice".to_string()].into_iter().collect();
        let without_comment = vec![r1.clone()];
        let mut with_comment = without_comment.clone();
        with_comment.push(ReviewObservation {
            author_login: "alice".to_string(),
            decision: ReviewDecision::Commented,
            revision: sha,
            submitted_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).unwrap(),
        });

        let ev_without = evaluate_reviews(&without_comment, &required, None);
        let ev_with = evaluate_reviews(&with_comment, &required, None);

        prop_assert_eq!(ev_without.all_required_approved, ev_with.all_required_approved);
        prop_assert_eq!(ev_without.any_changes_requested, ev_with.any_changes_requested);
        prop_assert_eq!(ev_without.latest_review_sha, ev_with.latest_review_sha);
    }
}
