//! The decision-hook boundary: records exchanged with the host environment
//! and the handlers behind each hook. Handlers take everything they need as
//! explicit inputs (parsed manifest, current branch, changed files) so they
//! are testable without a checkout; the CLI layer gathers the environment.

use crate::binding;
use crate::gate::{self, CheckpointValidator};
use crate::manifest::Manifest;
use crate::reconcile;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Block,
}

/// The structured output of every gate. `reason` is present only when
/// blocking or when an allow carries advisory information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Decision {
            decision: Verdict::Allow,
            reason: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Decision {
            decision: Verdict::Block,
            reason: Some(reason.into()),
        }
    }

    /// Allow, but carry an advisory note.
    pub fn advise(reason: impl Into<String>) -> Self {
        Decision {
            decision: Verdict::Allow,
            reason: Some(reason.into()),
        }
    }

    pub fn is_block(&self) -> bool {
        self.decision == Verdict::Block
    }
}

// ---------------------------------------------------------------------------
// HookInput
// ---------------------------------------------------------------------------

/// The triggering action: a free-text message, or a tool name plus its
/// structured input. Both prompt field spellings occur in the wild.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
}

impl HookInput {
    pub fn message(&self) -> &str {
        self.user_prompt
            .as_deref()
            .or(self.user_message.as_deref())
            .unwrap_or("")
    }

    /// The shell command of a tool call, when present.
    pub fn command(&self) -> Option<&str> {
        self.tool_input.as_ref()?.get("command")?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Hook handlers
// ---------------------------------------------------------------------------

/// Prompt hook: refuse work on main/master or an unbound branch while active
/// items exist. `manifest` is None when the file is missing — allow.
pub fn branch_guard(manifest: Option<&Manifest>, current_branch: &str, prompt: &str) -> Decision {
    match manifest {
        Some(manifest) => binding::guard_branch(manifest, current_branch, prompt),
        None => Decision::allow(),
    }
}

/// Prompt hook: gate advance/close requests on checkpoint state.
pub fn checkpoint_gate(
    manifest: Option<&Manifest>,
    message: &str,
    validator: &dyn CheckpointValidator,
) -> Decision {
    match manifest {
        Some(manifest) => gate::gate_prompt(manifest, message, validator),
        None => Decision::allow(),
    }
}

/// PreToolUse hook for `git push`: advisory only, never blocks.
pub fn push_guard(manifest: Option<&Manifest>, branch: &str, command: &str) -> Decision {
    if !command.contains("git push") {
        return Decision::allow();
    }
    let mut warnings = Vec::new();

    if let Some(slug) = branch.strip_prefix(crate::paths::BRANCH_PREFIX) {
        match manifest.and_then(|m| m.active().find(|i| i.branch_binding() == branch || i.slug == slug)) {
            None => {
                warnings.push(format!(
                    "Branch '{branch}' does not match any active work item"
                ));
            }
            Some(item) => {
                if let Some(stage) = item.parsed_stage().and_then(|s| s.stage()) {
                    if let Some(required) = stage.required_checkpoint() {
                        if item.checkpoint < required {
                            warnings.push(format!(
                                "Stage {stage} requires Checkpoint #{required} before push (current: #{})",
                                item.checkpoint
                            ));
                        }
                    }
                }
            }
        }
    } else {
        warnings.push(format!(
            "Pushing from '{branch}' — not a {}<slug> work item branch",
            crate::paths::BRANCH_PREFIX
        ));
    }

    if warnings.is_empty() {
        Decision::allow()
    } else {
        Decision::advise(format!("[flowgate] {}", warnings.join("; ")))
    }
}

/// Stop hook: advisory warnings for changed doc files missing from the
/// active item's docs record. Returns warning lines, never a block.
pub fn doc_paths(manifest: Option<&Manifest>, branch: &str, changed: &[String]) -> Vec<String> {
    let Some(manifest) = manifest else {
        return Vec::new();
    };
    let Some(item) = binding::resolve(&manifest.items, branch) else {
        return Vec::new();
    };
    reconcile::reconcile(changed, item)
}

/// Prompt hook: one status line per active work item, marking the line whose
/// binding matches the current branch.
pub fn status_lines(manifest: &Manifest, current_branch: &str) -> Vec<String> {
    manifest
        .active()
        .filter(|item| item.stage.is_some())
        .map(|item| {
            let branch = item.branch_binding();
            let marker = if branch == current_branch {
                " <-- current"
            } else {
                ""
            };
            let track = item
                .track
                .as_deref()
                .map(|t| format!(", {t}"))
                .unwrap_or_default();
            format!(
                "[flowgate] Active: {} (Stage {}{track}, {branch}){marker}",
                item.slug,
                item.stage.as_deref().unwrap_or("?"),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
