//! Dedupe & Iteration Gate — pure, applied after the state machine
//! (spec.md §4.3).

use pr_sync_types::{Action, DispatchMarkers};

/// Suppress a repeated dispatch: if the marker for this action's
/// dispatch kind already equals `head_sha`, replace the action with
/// `None`. Dedupe is idempotency, not throttling — it re-enables
/// automatically on every new head revision.
pub fn apply_dispatch_dedupe(action: Action, head_sha: &str, markers: &DispatchMarkers) -> Action {
    match action.dispatch_kind() {
        Some(kind) => match markers.get(kind) {
            Some(marker) if marker == head_sha => Action::None,
            _ => action,
        },
        None => action,
    }
}

/// Cap the fix loop: once `iteration >= max_iterations`, a computed
/// `needs_fix` is replaced by `max_iterations_reached`. Returns
/// `(action, cap_newly_hit)` — the bool is for logging only; the
/// iteration counter itself is incremented solely by
/// `Store::mark_dispatched` on a successful fix dispatch.
pub fn apply_iteration_gate(action: Action, iteration: u32, max_iterations: u32) -> (Action, bool) {
    if action == Action::NeedsFix && iteration >= max_iterations {
        (Action::MaxIterationsReached, true)
    } else {
        (action, false)
    }
}
