//! Decision hooks. Each reads one JSON event from stdin, gathers the
//! environment (manifest, branch, changed files), and prints its result to
//! stdout. Hooks always exit 0: a broken hook must never block the session.

use crate::output::print_json;
use clap::Subcommand;
use flowgate_core::gate::ScriptValidator;
use flowgate_core::git;
use flowgate_core::hook::{self, HookInput};
use flowgate_core::manifest::Manifest;
use std::io::Read;
use std::path::Path;

#[derive(Subcommand)]
pub enum HookKind {
    /// Refuse work on main/master or an unbound branch while items are active
    BranchGuard,
    /// Gate advance/close requests on checkpoint state
    CheckpointGate,
    /// Advisory warnings before a git push
    PushGuard,
    /// Advisory warnings for changed doc files the manifest does not record
    DocPaths,
    /// Emit a user_message record summarizing active work items
    Inject,
}

pub fn run(root: &Path, kind: HookKind) -> anyhow::Result<i32> {
    let input = read_input();
    let manifest = Manifest::load_from_root(root);
    let branch = git::current_branch(root).unwrap_or_default();

    match kind {
        HookKind::BranchGuard => {
            let decision = hook::branch_guard(manifest.as_ref(), &branch, input.message());
            print_json(&decision)?;
        }
        HookKind::CheckpointGate => {
            let validator = ScriptValidator::new(root);
            let decision = hook::checkpoint_gate(manifest.as_ref(), input.message(), &validator);
            print_json(&decision)?;
        }
        HookKind::PushGuard => {
            let command = input.command().unwrap_or_default();
            let decision = hook::push_guard(manifest.as_ref(), &branch, command);
            print_json(&decision)?;
        }
        HookKind::DocPaths => {
            let changed = git::changed_files(root);
            for warning in hook::doc_paths(manifest.as_ref(), &branch, &changed) {
                println!("{warning}");
            }
        }
        HookKind::Inject => {
            if let Some(manifest) = &manifest {
                let lines = hook::status_lines(manifest, &branch);
                if !lines.is_empty() {
                    print_json(&serde_json::json!({ "user_message": lines.join("\n") }))?;
                }
            }
        }
    }

    Ok(0)
}

/// Parse the stdin event. Unreadable or malformed input degrades to an empty
/// event, which every hook resolves to its allow/no-output path.
fn read_input() -> HookInput {
    let mut raw = String::new();
    if std::io::stdin().read_to_string(&mut raw).is_err() {
        return HookInput::default();
    }
    match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(err) => {
            if !raw.trim().is_empty() {
                tracing::warn!("unparseable hook input: {err}");
            }
            HookInput::default()
        }
    }
}
