//! Review Evaluator — pure function turning observed reviews into an
//! approval verdict (spec.md §4.1).

use pr_sync_types::{ApprovalPolicy, ReviewDecision, ReviewEvaluation, ReviewObservation};
use std::collections::HashSet;

/// Fold an ordered (by time) list of reviews into an approval verdict.
///
/// Only reviewers in `required` influence the result; everyone else's
/// decision is ignored entirely (spec.md §4.1, testable property 7).
/// Comment-only reviews neither count nor clear a prior decision.
pub fn evaluate_reviews(
    reviews: &[ReviewObservation],
    required: &HashSet<String>,
    policy: Option<&ApprovalPolicy>,
) -> ReviewEvaluation {
    let mut ordered: Vec<&ReviewObservation> = reviews.iter().collect();
    ordered.sort_by_key(|r| r.submitted_at);

    let mut eval = ReviewEvaluation::default();

    for review in ordered {
        if review.decision == ReviewDecision::Commented {
            continue;
        }
        let is_required = required
            .iter()
            .any(|login| login.eq_ignore_ascii_case(&review.author_login));
        if !is_required {
            continue;
        }
        eval.latest_decision_by_reviewer
            .insert(review.author_login.clone(), review.decision);
        eval.latest_review_sha = Some(review.revision.clone());
    }

    eval.all_required_approved = match policy {
        Some(policy) if policy.min_approvals.is_some() || !policy.required_logins.is_empty() => {
            evaluate_with_policy(&eval, required, policy)
        }
        _ => required.iter().all(|login| {
            eval.latest_decision_by_reviewer
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(login))
                .map(|(_, d)| *d == ReviewDecision::Approved)
                .unwrap_or(false)
        }),
    };

    eval.any_changes_requested = eval
        .latest_decision_by_reviewer
        .values()
        .any(|d| *d == ReviewDecision::ChangesRequested);

    eval
}

fn evaluate_with_policy(
    eval: &ReviewEvaluation,
    required: &HashSet<String>,
    policy: &ApprovalPolicy,
) -> bool {
    let approvals = required
        .iter()
        .filter(|login| {
            eval.latest_decision_by_reviewer
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(login))
                .map(|(_, d)| *d == ReviewDecision::Approved)
                .unwrap_or(false)
        })
        .count();

    let min_ok = policy
        .min_approvals
        .map(|min| approvals as u32 >= min)
        .unwrap_or(true);

    let required_logins_ok = policy.required_logins.iter().all(|login| {
        eval.latest_decision_by_reviewer
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(login))
            .map(|(_, d)| *d == ReviewDecision::Approved)
            .unwrap_or(false)
    });

    let no_veto = policy.veto_logins.iter().all(|login| {
        eval.latest_decision_by_reviewer
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(login))
            .map(|(_, d)| *d != ReviewDecision::ChangesRequested)
            .unwrap_or(true)
    });

    min_ok && required_logins_ok && no_veto
}
