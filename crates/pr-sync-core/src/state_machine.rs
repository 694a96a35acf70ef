//! State Machine — pure function turning a GitHub observation plus
//! prior state into `(status, action)` (spec.md §4.2).

use crate::evaluator::evaluate_reviews;
use pr_sync_types::{
    Action, ApprovalPolicy, IssueObservation, MergeStateStatus, Mergeable, PrObservation,
    ReviewDecision, Status, UpstreamState, WorkflowItem,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Output of `determine_pr_action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrDecision {
    pub status: Status,
    pub action: Action,
    pub all_approved: bool,
    pub any_changes_requested: bool,
    pub decisions: HashMap<String, ReviewDecision>,
    pub last_reviewed_sha: Option<String>,
    pub has_conflicts: bool,
}

/// `has_conflicts ⇔ mergeable = conflicting ∨ merge_state = dirty`
/// (spec.md §4.2, case-insensitive — already normalized by the
/// `Mergeable`/`MergeStateStatus` parsers at the adapter boundary).
fn has_conflicts(observation: &PrObservation) -> bool {
    observation.mergeable == Mergeable::Conflicting
        || observation.merge_state == MergeStateStatus::Dirty
}

/// Resolve the baseline `last_reviewed_sha` per spec.md §4.2: critical
/// for correctness on first sync, since it must never silently default
/// to `head_sha` when no review has actually landed on it.
fn resolve_last_reviewed_sha(
    all_approved: bool,
    latest_review_sha: &Option<String>,
    head_sha: &str,
    prior: Option<&WorkflowItem>,
) -> Option<String> {
    let approved_on_head = all_approved && latest_review_sha.as_deref() == Some(head_sha);
    if approved_on_head {
        Some(head_sha.to_string())
    } else if let Some(sha) = latest_review_sha {
        Some(sha.clone())
    } else {
        prior.and_then(|p| p.last_reviewed_sha.clone())
    }
}

/// Determine `(status, action)` for one observed pull request (spec.md
/// §4.2 rules table, first match wins).
pub fn determine_pr_action(
    observation: &PrObservation,
    prior: Option<&WorkflowItem>,
    required_reviewers: &[String],
    policy: Option<&ApprovalPolicy>,
) -> PrDecision {
    let required: HashSet<String> = required_reviewers.iter().cloned().collect();
    let eval = evaluate_reviews(&observation.reviews, &required, policy);
    let conflicts = has_conflicts(observation);

    let last_reviewed_sha = resolve_last_reviewed_sha(
        eval.all_required_approved,
        &eval.latest_review_sha,
        &observation.head_sha,
        prior,
    );
    let sha_matches_review = last_reviewed_sha.as_deref() == Some(observation.head_sha.as_str());

    let (status, action) = if observation.state == UpstreamState::Merged {
        (Status::Merged, Action::None)
    } else if conflicts {
        // Rules 2 and 3 share the same outcome: conflicts always win
        // over approval, whether or not the PR would otherwise be
        // ready to merge.
        (Status::Conflicting, Action::NeedsConflictResolution)
    } else if observation.merge_state == MergeStateStatus::Unstable {
        (Status::ChecksFailing, Action::NeedsStatusFix)
    } else if eval.all_required_approved && sha_matches_review {
        (Status::Approved, Action::ReadyToMerge)
    } else if eval.all_required_approved {
        (Status::PendingReview, Action::NeedsReview)
    } else if eval.any_changes_requested && sha_matches_review {
        (Status::ChangesRequested, Action::NeedsFix)
    } else {
        (Status::PendingReview, Action::NeedsReview)
    };

    PrDecision {
        status,
        action,
        all_approved: eval.all_required_approved,
        any_changes_requested: eval.any_changes_requested,
        decisions: eval.latest_decision_by_reviewer,
        last_reviewed_sha,
        has_conflicts: conflicts,
    }
}

/// Output of `determine_issue_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueDecision {
    pub status: Status,
    pub action: Action,
}

fn closing_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(closes|fixes|resolves)\s*:?\s*#(\d+)\b").unwrap()
    })
}

/// Whether `body` contains a closing-keyword reference to `issue_number`
/// (spec.md §4.2 issue rules: `closes`, `fixes`, `resolves` followed by
/// `#number`, case-insensitive, word-boundary). A bare `#N` or the word
/// `addresses` is deliberately not a match — the keyword set is exactly
/// as spec.md states, no broader.
pub fn body_closes_issue(body: &str, issue_number: u64) -> bool {
    closing_keyword_regex()
        .captures_iter(body)
        .any(|cap| cap.get(2).and_then(|m| m.as_str().parse::<u64>().ok()) == Some(issue_number))
}

/// Determine `(status, action)` for one observed issue (spec.md §4.2
/// issue rules, first match wins).
pub fn determine_issue_action(
    observation: &IssueObservation,
    prior: Option<&WorkflowItem>,
    open_prs: &[PrObservation],
) -> IssueDecision {
    if observation.closed {
        return IssueDecision {
            status: Status::Closed,
            action: Action::None,
        };
    }

    let linked = open_prs.iter().any(|pr| {
        pr.body
            .as_deref()
            .map(|body| body_closes_issue(body, observation.number))
            .unwrap_or(false)
    });
    if linked {
        return IssueDecision {
            status: Status::PrCreated,
            action: Action::None,
        };
    }

    if prior.map(|p| p.status) == Some(Status::InProgress) {
        return IssueDecision {
            status: Status::InProgress,
            action: Action::None,
        };
    }

    IssueDecision {
        status: Status::Open,
        action: Action::NeedsDev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pr_sync_types::ReviewObservation;

    fn review(author: &str, decision: ReviewDecision, sha: &str) -> ReviewObservation {
        ReviewObservation {
            author_login: author.to_string(),
            decision,
            revision: sha.to_string(),
            submitted_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn pr(state: UpstreamState, head_sha: &str, reviews: Vec<ReviewObservation>) -> PrObservation {
        PrObservation {
            repo: "miller46/jm-api".into(),
            number: 10,
            title: "test PR".into(),
            author: None,
            labels: vec![],
            state,
            head_sha: head_sha.to_string(),
            head_ref_name: None,
            mergeable: Mergeable::Mergeable,
            merge_state: MergeStateStatus::Clean,
            status_check_rollup: None,
            reviews,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            body: None,
        }
    }

    #[test]
    fn changes_requested_same_sha_needs_fix() {
        let reviews = vec![
            review("code-snob", ReviewDecision::ChangesRequested, "abc123"),
            review("architect", ReviewDecision::Approved, "abc123"),
        ];
        let p = pr(UpstreamState::Open, "abc123", reviews);
        let decision = determine_pr_action(
            &p,
            None,
            &["code-snob".into(), "architect".into()],
            None,
        );
        assert_eq!(decision.status, Status::ChangesRequested);
        assert_eq!(decision.action, Action::NeedsFix);
    }

    #[test]
    fn new_commit_after_changes_requested_needs_review() {
        let reviews = vec![
            review("code-snob", ReviewDecision::ChangesRequested, "old_sha"),
            review("architect", ReviewDecision::Approved, "old_sha"),
        ];
        let p = pr(UpstreamState::Open, "new_sha", reviews);
        let decision = determine_pr_action(
            &p,
            None,
            &["code-snob".into(), "architect".into()],
            None,
        );
        assert_eq!(decision.status, Status::PendingReview);
        assert_eq!(decision.action, Action::NeedsReview);
    }

    #[test]
    fn all_approved_current_sha_ready_to_merge() {
        let reviews = vec![
            review("code-snob", ReviewDecision::Approved, "abc123"),
            review("architect", ReviewDecision::Approved, "abc123"),
        ];
        let p = pr(UpstreamState::Open, "abc123", reviews);
        let decision = determine_pr_action(
            &p,
            None,
            &["code-snob".into(), "architect".into()],
            None,
        );
        assert_eq!(decision.status, Status::Approved);
        assert_eq!(decision.action, Action::ReadyToMerge);
    }

    #[test]
    fn merged_pr_short_circuits_everything_else() {
        let p = pr(UpstreamState::Merged, "abc123", vec![]);
        let decision = determine_pr_action(&p, None, &["code-snob".into()], None);
        assert_eq!(decision.status, Status::Merged);
        assert_eq!(decision.action, Action::None);
    }

    #[test]
    fn conflicts_take_precedence_over_approval() {
        let reviews = vec![review("a", ReviewDecision::Approved, "sha1")];
        let mut p = pr(UpstreamState::Open, "sha1", reviews);
        p.mergeable = Mergeable::Conflicting;
        let decision = determine_pr_action(&p, None, &["a".into()], None);
        assert_eq!(decision.status, Status::Conflicting);
        assert_eq!(decision.action, Action::NeedsConflictResolution);
    }

    #[test]
    fn unstable_checks_need_status_fix() {
        let mut p = pr(UpstreamState::Open, "sha1", vec![]);
        p.merge_state = MergeStateStatus::Unstable;
        let decision = determine_pr_action(&p, None, &["a".into()], None);
        assert_eq!(decision.status, Status::ChecksFailing);
        assert_eq!(decision.action, Action::NeedsStatusFix);
    }

    #[test]
    fn first_sync_baseline_is_none_without_any_review() {
        let p = pr(UpstreamState::Open, "sha1", vec![]);
        let decision = determine_pr_action(&p, None, &["a".into()], None);
        assert_eq!(decision.last_reviewed_sha, None);
        assert_eq!(decision.status, Status::PendingReview);
        assert_eq!(decision.action, Action::NeedsReview);
    }

    #[test]
    fn closing_keyword_matches_required_forms() {
        assert!(body_closes_issue("Closes #42", 42));
        assert!(body_closes_issue("this FIXES #42 nicely", 42));
        assert!(body_closes_issue("Resolves: #42", 42));
        assert!(!body_closes_issue("see #42", 42));
        assert!(!body_closes_issue("addresses #42", 42));
        assert!(!body_closes_issue("closes #43", 42));
    }

    #[test]
    fn issue_closed_upstream_wins() {
        let obs = IssueObservation {
            repo: "o/r".into(),
            number: 1,
            title: "t".into(),
            author: None,
            labels: vec![],
            closed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let decision = determine_issue_action(&obs, None, &[]);
        assert_eq!(decision.status, Status::Closed);
        assert_eq!(decision.action, Action::None);
    }

    #[test]
    fn issue_with_linked_open_pr_is_pr_created() {
        let obs = IssueObservation {
            repo: "o/r".into(),
            number: 100,
            title: "t".into(),
            author: None,
            labels: vec![],
            closed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut linked_pr = pr(UpstreamState::Open, "sha1", vec![]);
        linked_pr.body = Some("Closes #100".into());
        let decision = determine_issue_action(&obs, None, std::slice::from_ref(&linked_pr));
        assert_eq!(decision.status, Status::PrCreated);
        assert_eq!(decision.action, Action::None);
    }

    #[test]
    fn issue_with_no_pr_needs_dev() {
        let obs = IssueObservation {
            repo: "o/r".into(),
            number: 5,
            title: "t".into(),
            author: None,
            labels: vec![],
            closed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let decision = determine_issue_action(&obs, None, &[]);
        assert_eq!(decision.status, Status::Open);
        assert_eq!(decision.action, Action::NeedsDev);
    }
}
