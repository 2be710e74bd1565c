//! Branch-to-work-item binding resolution and the branch guard built on it.

use crate::hook::Decision;
use crate::manifest::Manifest;
use crate::workitem::WorkItem;

/// Prompts containing any of these may run on any branch; they are how new
/// work items get registered in the first place.
pub const REGISTRATION_KEYWORDS: &[&str] = &["manage-work", "register", "clarify-demand"];

const PROTECTED_BRANCHES: &[&str] = &["main", "master"];

/// Resolve `branch` to at most one active work item.
///
/// Each active item binds to its explicit `branch` field, else `feat/<slug>`.
/// When two active items compute the same binding the item declared later in
/// file order wins. That tie rule is inherited behavior, kept for
/// determinism rather than by design.
pub fn resolve<'a>(items: &'a [WorkItem], branch: &str) -> Option<&'a WorkItem> {
    items
        .iter()
        .filter(|item| item.is_active() && item.branch_binding() == branch)
        .last()
}

/// Bindings of all active items, in file order.
pub fn active_bindings(items: &[WorkItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.is_active())
        .map(|item| item.branch_binding())
        .collect()
}

/// Decide whether work may proceed on `current_branch`.
///
/// Registration prompts always pass. With no active items there is nothing
/// to protect. Otherwise work is refused on main/master and on branches that
/// resolve to no active item.
pub fn guard_branch(manifest: &Manifest, current_branch: &str, prompt: &str) -> Decision {
    let lower = prompt.to_lowercase();
    if REGISTRATION_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Decision::allow();
    }

    let mut bindings = active_bindings(&manifest.items);
    if bindings.is_empty() {
        return Decision::allow();
    }
    bindings.sort();
    bindings.dedup();
    let active_list = bindings.join(", ");

    if PROTECTED_BRANCHES.contains(&current_branch) {
        return Decision::block(format!(
            "[flowgate] Work blocked on '{current_branch}'. Switch to an active work \
             item branch ({active_list}) or register a new one: \
             /manage-work register \"<description>\" <ID> <track>"
        ));
    }

    if resolve(&manifest.items, current_branch).is_some() {
        return Decision::allow();
    }

    Decision::block(format!(
        "[flowgate] Branch '{current_branch}' does not match any active work item. \
         Active branches: {active_list}. Switch to a work item branch or register a new one."
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(text)
    }

    #[test]
    fn resolve_default_binding() {
        let m = manifest("workitems:\n  add-auth:\n    stage: F\n");
        let item = resolve(&m.items, "feat/add-auth").unwrap();
        assert_eq!(item.slug, "add-auth");
        assert!(resolve(&m.items, "feat/other").is_none());
    }

    #[test]
    fn resolve_explicit_branch_overrides_slug() {
        let m = manifest("workitems:\n  add-auth:\n    stage: F\n    branch: custom/x\n");
        assert!(resolve(&m.items, "feat/add-auth").is_none());
        assert_eq!(resolve(&m.items, "custom/x").unwrap().slug, "add-auth");
    }

    #[test]
    fn resolve_skips_done_items() {
        let m = manifest("workitems:\n  done-item:\n    stage: DONE\n");
        assert!(resolve(&m.items, "feat/done-item").is_none());
    }

    #[test]
    fn resolve_tie_last_declared_wins() {
        // Two active items computing the same binding feat/x
        let m = manifest(
            "workitems:\n  first:\n    stage: F\n    branch: feat/x\n  x:\n    stage: G\n",
        );
        let item = resolve(&m.items, "feat/x").unwrap();
        assert_eq!(item.slug, "x");
        // Deterministic and repeatable
        assert_eq!(resolve(&m.items, "feat/x").unwrap().slug, "x");
    }

    #[test]
    fn guard_allows_registration_keywords_anywhere() {
        let m = manifest("workitems:\n  x:\n    stage: F\n");
        for prompt in [
            "/manage-work register \"new thing\" 042 small",
            "please REGISTER this",
            "run clarify-demand",
        ] {
            assert!(!guard_branch(&m, "main", prompt).is_block(), "{prompt}");
        }
    }

    #[test]
    fn guard_allows_when_no_active_items() {
        let m = manifest("workitems:\n  x:\n    stage: DONE\n");
        assert!(!guard_branch(&m, "main", "edit code").is_block());
        assert!(!guard_branch(&Manifest::default(), "main", "edit code").is_block());
    }

    #[test]
    fn guard_blocks_main_with_active_items() {
        let m = manifest("workitems:\n  x:\n    stage: F\n  y:\n    stage: G\n");
        for branch in ["main", "master"] {
            let d = guard_branch(&m, branch, "edit code");
            assert!(d.is_block());
            let reason = d.reason.unwrap();
            assert!(reason.contains("feat/x"), "{reason}");
            assert!(reason.contains("feat/y"), "{reason}");
        }
    }

    #[test]
    fn guard_blocks_unbound_branch() {
        let m = manifest("workitems:\n  x:\n    stage: F\n");
        let d = guard_branch(&m, "feat/unknown", "edit code");
        assert!(d.is_block());
        assert!(d.reason.unwrap().contains("does not match any active work item"));
    }

    #[test]
    fn guard_allows_matching_branch() {
        let m = manifest("workitems:\n  x:\n    stage: F\n");
        assert!(!guard_branch(&m, "feat/x", "edit code").is_block());
    }
}
