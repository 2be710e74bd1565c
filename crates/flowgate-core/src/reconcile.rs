//! Doc-path reconciliation: compare files changed in the working tree
//! against the doc paths recorded on the active work item, and produce
//! advisory warnings for anything the record has not caught up with.

use crate::workitem::WorkItem;
use regex::Regex;
use std::sync::OnceLock;

/// Where a changed doc file belongs on the work item record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocSlot {
    Prd,
    Discovery,
    Specs,
    Adrs,
    Feature,
    Opnote,
}

impl DocSlot {
    pub fn field(self) -> &'static str {
        match self {
            DocSlot::Prd => "prd",
            DocSlot::Discovery => "discovery",
            DocSlot::Specs => "specs",
            DocSlot::Adrs => "adrs",
            DocSlot::Feature => "feature",
            DocSlot::Opnote => "opnote",
        }
    }
}

static PATTERNS: OnceLock<Vec<(Regex, DocSlot)>> = OnceLock::new();

fn patterns() -> &'static [(Regex, DocSlot)] {
    PATTERNS.get_or_init(|| {
        [
            (r"^docs/prds/prd.*\.md$", DocSlot::Prd),
            (r"^docs/discovery/disco-.*\.md$", DocSlot::Discovery),
            (r"^docs/specs/spec-.*\.md$", DocSlot::Specs),
            (r"^docs/adrs/adr-.*\.md$", DocSlot::Adrs),
            (r"^docs/features/ft-.*\.md$", DocSlot::Feature),
            (r"^docs/op-notes/op-.*\.md$", DocSlot::Opnote),
        ]
        .into_iter()
        .map(|(pattern, slot)| {
            // Patterns are fixed literals, compiled once
            (Regex::new(pattern).unwrap_or_else(|_| Regex::new("$^").unwrap()), slot)
        })
        .collect()
    })
}

/// Classify a repo-relative path as one of the tracked doc slots.
pub fn classify(path: &str) -> Option<DocSlot> {
    patterns()
        .iter()
        .find(|(re, _)| re.is_match(path))
        .map(|&(_, slot)| slot)
}

/// Warnings for changed doc files the item's record does not mention.
/// Advisory only; the record is never rewritten here.
pub fn reconcile(changed: &[String], item: &WorkItem) -> Vec<String> {
    let mut warnings = Vec::new();
    for path in changed {
        let Some(slot) = classify(path) else {
            continue;
        };
        let recorded = match slot {
            DocSlot::Prd => item.docs.prd.as_deref() == Some(path.as_str()),
            DocSlot::Discovery => item.docs.discovery.as_deref() == Some(path.as_str()),
            DocSlot::Feature => item.docs.feature.as_deref() == Some(path.as_str()),
            DocSlot::Opnote => item.docs.opnote.as_deref() == Some(path.as_str()),
            DocSlot::Specs => item.docs.specs.iter().any(|p| p == path),
            DocSlot::Adrs => item.docs.adrs.iter().any(|p| p == path),
        };
        if !recorded {
            warnings.push(format!(
                "[flowgate] Warning: '{path}' changed but docs.{} for '{}' does not record it. \
                 Update docs/workflow-state.yaml.",
                slot.field(),
                item.slug
            ));
        }
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
