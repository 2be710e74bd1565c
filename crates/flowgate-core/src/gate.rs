//! Checkpoint gate for stage advance and close requests.
//!
//! The gate reads the request out of a free-text prompt, resolves the named
//! work item, and compares its checkpoint against the gate table. An external
//! validator can vouch for an unmet checkpoint; without a passing report the
//! request is refused.

use crate::hook::Decision;
use crate::manifest::Manifest;
use crate::paths;
use crate::proc;
use crate::types::{checkpoint_name, CLOSE_CHECKPOINT};
use crate::workitem::WorkItem;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const VALIDATOR_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Request extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    Advance,
    Close,
}

impl GateAction {
    fn keyword(self) -> &'static str {
        match self {
            GateAction::Advance => "advance",
            GateAction::Close => "close",
        }
    }
}

/// Detect an advance/close request in `message`. Close wins when both words
/// appear, since closing subsumes advancing.
pub fn detect_action(message: &str) -> Option<GateAction> {
    let words: Vec<String> = message
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .collect();
    if words.iter().any(|w| w == "close") {
        Some(GateAction::Close)
    } else if words.iter().any(|w| w == "advance") {
        Some(GateAction::Advance)
    } else {
        None
    }
}

/// The word following the action keyword, when it looks like an item token
/// (slug or id) rather than a flag.
pub fn extract_item_token(message: &str, action: GateAction) -> Option<String> {
    let words: Vec<&str> = message.split_whitespace().collect();
    let keyword = action.keyword();
    let pos = words.iter().position(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric())
            .eq_ignore_ascii_case(keyword)
    })?;
    let raw = words.get(pos + 1)?;
    if raw.starts_with('-') {
        return None;
    }
    let token = raw
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ':' | ';'));
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorIssue {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
}

/// Non-blocking validator diagnostics, emitted as `{"message": ...}` records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorWarning {
    #[serde(default)]
    pub message: String,
}

/// Parsed output of the external checkpoint validator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorReport {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<ValidatorIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidatorWarning>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ValidatorReport {
    /// A one-line account of why validation failed.
    pub fn failure_summary(&self) -> String {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        let blocking: Vec<&str> = self
            .issues
            .iter()
            .map(|i| i.message.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        if blocking.is_empty() {
            "validator reported failure".to_string()
        } else {
            blocking.join("; ")
        }
    }
}

/// Source of checkpoint evidence. `None` means no report could be produced
/// (validator missing, crashed, timed out, or emitted unparseable output).
pub trait CheckpointValidator {
    fn validate(&self, checkpoint: u8) -> Option<ValidatorReport>;
}

/// Runs the project's validator script and parses its JSON report.
pub struct ScriptValidator {
    root: PathBuf,
}

impl ScriptValidator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CheckpointValidator for ScriptValidator {
    fn validate(&self, checkpoint: u8) -> Option<ValidatorReport> {
        let script = paths::validator_script(&self.root);
        if !script.is_file() {
            tracing::debug!("no validator script at {}", script.display());
            return None;
        }
        let script = script.to_string_lossy().to_string();
        let checkpoint = checkpoint.to_string();
        let root = self.root.to_string_lossy().to_string();
        let args = [
            script.as_str(),
            checkpoint.as_str(),
            "--json",
            "--project-root",
            root.as_str(),
        ];
        let out = proc::run_with_timeout("python3", &args, &self.root, VALIDATOR_TIMEOUT)?;
        match serde_json::from_str(&out.stdout) {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!("unparseable validator output: {err}");
                None
            }
        }
    }
}

/// Validator that never produces a report. For contexts with no project root.
pub struct NoValidator;

impl CheckpointValidator for NoValidator {
    fn validate(&self, _checkpoint: u8) -> Option<ValidatorReport> {
        None
    }
}

// ---------------------------------------------------------------------------
// Gate decisions
// ---------------------------------------------------------------------------

/// Gate a prompt. Anything that is not an identifiable advance/close request
/// against a known item passes untouched.
pub fn gate_prompt(
    manifest: &Manifest,
    message: &str,
    validator: &dyn CheckpointValidator,
) -> Decision {
    let Some(action) = detect_action(message) else {
        return Decision::allow();
    };
    let Some(token) = extract_item_token(message, action) else {
        return Decision::allow();
    };
    let Some(item) = manifest.find(&token) else {
        return Decision::allow();
    };
    match action {
        GateAction::Close => decide_close(item),
        GateAction::Advance => decide_advance(item, validator),
    }
}

fn decide_close(item: &WorkItem) -> Decision {
    if item.checkpoint >= CLOSE_CHECKPOINT {
        return Decision::allow();
    }
    Decision::block(format!(
        "[flowgate] Cannot close '{}': Checkpoint #{CLOSE_CHECKPOINT} ({}) not reached \
         (current: #{}). Complete the implementation checkpoint first.",
        item.slug,
        checkpoint_name(CLOSE_CHECKPOINT),
        item.checkpoint
    ))
}

fn decide_advance(item: &WorkItem, validator: &dyn CheckpointValidator) -> Decision {
    let Some(stage) = item.parsed_stage().and_then(|s| s.stage()) else {
        return Decision::allow();
    };
    let Some(required) = stage.required_checkpoint() else {
        return Decision::allow();
    };
    if item.checkpoint >= required {
        return Decision::allow();
    }
    match validator.validate(required) {
        Some(report) if report.valid => Decision::allow(),
        Some(report) => Decision::block(format!(
            "[flowgate] Cannot advance '{}' past Stage {stage}: Checkpoint #{required} ({}) \
             validation failed: {}",
            item.slug,
            checkpoint_name(required),
            report.failure_summary()
        )),
        None => Decision::block(format!(
            "[flowgate] Cannot advance '{}' past Stage {stage}: Checkpoint #{required} ({}) \
             not reached (current: #{}).",
            item.slug,
            checkpoint_name(required),
            item.checkpoint
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedValidator(Option<ValidatorReport>);

    impl CheckpointValidator for FixedValidator {
        fn validate(&self, _checkpoint: u8) -> Option<ValidatorReport> {
            self.0.clone()
        }
    }

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(text)
    }

    #[test]
    fn detects_actions() {
        assert_eq!(detect_action("please advance add-auth"), Some(GateAction::Advance));
        assert_eq!(detect_action("/manage-work close add-auth"), Some(GateAction::Close));
        assert_eq!(detect_action("ADVANCE it"), Some(GateAction::Advance));
        assert_eq!(detect_action("work on the parser"), None);
        // "close" wins over "advance"
        assert_eq!(
            detect_action("advance and then close add-auth"),
            Some(GateAction::Close)
        );
        // Substrings of other words do not trigger
        assert_eq!(detect_action("advanced analytics disclosed"), None);
    }

    #[test]
    fn extracts_item_token() {
        assert_eq!(
            extract_item_token("advance add-auth", GateAction::Advance),
            Some("add-auth".to_string())
        );
        assert_eq!(
            extract_item_token("close \"add-auth\".", GateAction::Close),
            Some("add-auth".to_string())
        );
        assert_eq!(
            extract_item_token("advance 030 now", GateAction::Advance),
            Some("030".to_string())
        );
        assert_eq!(extract_item_token("advance --all", GateAction::Advance), None);
        assert_eq!(extract_item_token("advance", GateAction::Advance), None);
    }

    #[test]
    fn non_request_passes() {
        let m = manifest("workitems:\n  add-auth:\n    track: micro\n    stage: F\n");
        let d = gate_prompt(&m, "refactor the parser", &FixedValidator(None));
        assert!(!d.is_block());
    }

    #[test]
    fn unknown_item_passes() {
        let m = manifest("workitems:\n  add-auth:\n    track: micro\n    stage: F\n");
        let d = gate_prompt(&m, "advance other-item", &FixedValidator(None));
        assert!(!d.is_block());
    }

    #[test]
    fn advance_ungated_stage_passes() {
        // G carries no gate
        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: G\n    checkpoint: 3\n");
        assert!(!gate_prompt(&m, "advance x", &FixedValidator(None)).is_block());
    }

    #[test]
    fn advance_blocked_without_checkpoint() {
        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: F\n    checkpoint: 0\n");
        let d = gate_prompt(&m, "advance x", &FixedValidator(None));
        assert!(d.is_block());
        let reason = d.reason.unwrap();
        assert!(reason.contains("Checkpoint #3"), "{reason}");
        assert!(reason.contains("Tests Complete"), "{reason}");
        assert!(reason.contains("'x'"), "{reason}");
    }

    #[test]
    fn advance_allowed_with_checkpoint() {
        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: F\n    checkpoint: 3\n");
        assert!(!gate_prompt(&m, "advance x", &FixedValidator(None)).is_block());
    }

    #[test]
    fn passing_validator_overrides_stale_checkpoint() {
        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: F\n    checkpoint: 0\n");
        let report = ValidatorReport {
            valid: true,
            ..Default::default()
        };
        assert!(!gate_prompt(&m, "advance x", &FixedValidator(Some(report))).is_block());
    }

    #[test]
    fn failing_validator_blocks_with_summary() {
        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: F\n    checkpoint: 0\n");
        let report = ValidatorReport {
            valid: false,
            summary: Some("2 tests failing".to_string()),
            ..Default::default()
        };
        let d = gate_prompt(&m, "advance x", &FixedValidator(Some(report)));
        assert!(d.is_block());
        assert!(d.reason.unwrap().contains("2 tests failing"));
    }

    #[test]
    fn failure_summary_falls_back_to_issues() {
        let report = ValidatorReport {
            valid: false,
            issues: vec![
                ValidatorIssue {
                    severity: "error".to_string(),
                    message: "missing op-note".to_string(),
                },
                ValidatorIssue {
                    severity: "error".to_string(),
                    message: "uncommitted changes".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(report.failure_summary(), "missing op-note; uncommitted changes");
        assert_eq!(
            ValidatorReport::default().failure_summary(),
            "validator reported failure"
        );
    }

    #[test]
    fn close_gated_on_implementation_checkpoint() {
        let m = manifest(
            "workitems:\n  x:\n    track: small\n    stage: H\n    checkpoint: 3\n  y:\n    track: small\n    stage: H\n    checkpoint: 4\n",
        );
        let d = gate_prompt(&m, "close x", &FixedValidator(None));
        assert!(d.is_block());
        let reason = d.reason.unwrap();
        assert!(reason.contains("Checkpoint #4"), "{reason}");
        assert!(reason.contains("Implementation Complete"), "{reason}");

        assert!(!gate_prompt(&m, "close y", &FixedValidator(None)).is_block());
    }

    #[test]
    fn close_by_id_token() {
        let m = manifest(
            "workitems:\n  x:\n    id: \"030\"\n    track: small\n    stage: H\n    checkpoint: 0\n",
        );
        let d = gate_prompt(&m, "close 030", &FixedValidator(None));
        assert!(d.is_block());
        assert!(d.reason.unwrap().contains("'x'"));
    }

    #[test]
    fn validator_report_parses_with_defaults() {
        let report: ValidatorReport =
            serde_json::from_str(r#"{"valid":false,"issues":[{"message":"m"}]}"#).unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn warnings_bearing_passing_report_allows() {
        // The validator routinely emits object-shaped warnings on an
        // otherwise passing run; they must not poison the whole report.
        let report: ValidatorReport = serde_json::from_str(
            r#"{"valid":true,"issues":[],"warnings":[{"message":"checkpoint 3 sub-script missing"}],"summary":"PASS"}"#,
        )
        .unwrap();
        assert!(report.valid);
        assert_eq!(report.warnings[0].message, "checkpoint 3 sub-script missing");

        let m = manifest("workitems:\n  x:\n    track: micro\n    stage: F\n    checkpoint: 0\n");
        assert!(!gate_prompt(&m, "advance x", &FixedValidator(Some(report))).is_block());
    }
}
