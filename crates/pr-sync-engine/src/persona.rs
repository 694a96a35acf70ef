//! Dev-agent suggestion heuristic. Spec.md §9 calls this out explicitly
//! as "pluggable, not a contract" — a `PersonaStrategy` trait with the
//! title/label string-matching heuristic as the default, swappable
//! implementation.
//!
//! Grounded on `original_source/github/get_open_prs.py::_suggest_agent`.

const FRONTEND_TERMS: &[&str] = &[
    "frontend", "ui", "ux", "react", "css", "tailwind", "nextjs", "next.js",
];
const BACKEND_TERMS: &[&str] = &[
    "backend", "api", "db", "database", "sql", "postgres", "migration", "fastapi", "django",
];

/// Maps an item's title + labels to one of a small set of developer
/// personas. Not a contract: callers may supply their own strategy.
pub trait PersonaStrategy: Send + Sync {
    fn suggest(&self, title: &str, labels: &[String], default_agent: &str) -> String;
}

/// The original's string-matching heuristic, carried verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleLabelHeuristic;

impl PersonaStrategy for TitleLabelHeuristic {
    fn suggest(&self, title: &str, labels: &[String], default_agent: &str) -> String {
        let haystack = format!("{title} {}", labels.join(" ")).to_lowercase();
        if FRONTEND_TERMS.iter().any(|t| haystack.contains(t)) {
            "frontend-dev".to_string()
        } else if BACKEND_TERMS.iter().any(|t| haystack.contains(t)) {
            "backend-dev".to_string()
        } else {
            default_agent.to_string()
        }
    }
}

/// Convenience wrapper for call sites that don't need a custom strategy.
pub fn suggest_agent(title: &str, labels: &[String], default_agent: &str) -> String {
    TitleLabelHeuristic.suggest(title, labels, default_agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_terms_win() {
        let agent = suggest_agent("Fix React hydration bug", &["ui".into()], "backend-dev");
        assert_eq!(agent, "frontend-dev");
    }

    #[test]
    fn backend_terms_win() {
        let agent = suggest_agent("Add Postgres migration for users table", &[], "frontend-dev");
        assert_eq!(agent, "backend-dev");
    }

    #[test]
    fn unmatched_text_falls_back_to_default() {
        let agent = suggest_agent("Update changelog", &["docs".into()], "release-manager");
        assert_eq!(agent, "release-manager");
    }

    #[test]
    fn labels_participate_in_matching() {
        let agent = suggest_agent("Quarterly cleanup", &["frontend".into()], "backend-dev");
        assert_eq!(agent, "frontend-dev");
    }
}
