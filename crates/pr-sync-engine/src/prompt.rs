//! Prompt construction for dispatched agents.
//!
//! Prompt-text authoring is explicitly out of scope for this engine
//! (spec.md §1): the actual wording handed to a development, review, or
//! merge agent is owned by the prompt-authoring system sitting in front
//! of the agent-spawn transport. What the engine owns is the *trigger*
//! — which item, which action, which revision — so `PromptBuilder`
//! produces a minimal structural scaffold, not authored prose, and
//! callers are expected to substitute their own implementation when
//! wiring this engine into a real prompt-authoring pipeline.

use crate::queue::QueueItem;
use pr_sync_types::ActionKind;

pub trait PromptBuilder: Send + Sync {
    fn build(&self, kind: ActionKind, item: &QueueItem) -> String;
}

/// Structural placeholder: names the item, action, and revision and
/// nothing else. Good enough to drive integration tests against a fake
/// `AgentSpawner`; not intended as agent-facing copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaffoldPromptBuilder;

impl PromptBuilder for ScaffoldPromptBuilder {
    fn build(&self, kind: ActionKind, item: &QueueItem) -> String {
        format!(
            "action={} repo={} number={} title={:?} head_sha={}",
            kind.as_str(),
            item.repo,
            item.number,
            item.title,
            item.head_sha.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueItem;

    #[test]
    fn scaffold_includes_action_and_identity() {
        let item = QueueItem {
            item_id: "o/r#pr#1".into(),
            kind: pr_sync_types::ItemKind::Pr,
            repo: "o/r".into(),
            number: 1,
            title: "Add widget".into(),
            author: None,
            head_sha: Some("sha1".into()),
            head_ref_name: None,
            status: "pending_review".into(),
            dispatch_type: "review".into(),
            has_conflicts: None,
            all_reviewers_approved: None,
            any_changes_requested: None,
            last_reviewed_sha: None,
            iteration: None,
            reviewers: None,
            suggested_dev_agent: None,
        };
        let prompt = ScaffoldPromptBuilder.build(ActionKind::Review, &item);
        assert!(prompt.contains("action=review"));
        assert!(prompt.contains("o/r"));
        assert!(prompt.contains("sha1"));
    }
}
