use crate::paths::BRANCH_PREFIX;
use crate::types::{StageState, Track, MAX_CHECKPOINT};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Docs
// ---------------------------------------------------------------------------

/// Document pointers recorded on a work item. Scalar fields hold at most one
/// path; `specs` and `adrs` are ordered lists (order = insertion).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docs {
    pub prd: Option<String>,
    pub discovery: Option<String>,
    pub feature: Option<String>,
    pub opnote: Option<String>,
    #[serde(default)]
    pub specs: Vec<String>,
    #[serde(default)]
    pub adrs: Vec<String>,
}

impl Docs {
    pub fn is_empty(&self) -> bool {
        self.prd.is_none()
            && self.discovery.is_none()
            && self.feature.is_none()
            && self.opnote.is_none()
            && self.specs.is_empty()
            && self.adrs.is_empty()
    }

    /// All recorded paths, scalars first, then lists.
    pub fn all_paths(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        for (name, value) in [
            ("prd", &self.prd),
            ("discovery", &self.discovery),
            ("feature", &self.feature),
            ("opnote", &self.opnote),
        ] {
            if let Some(path) = value {
                out.push((name, path.as_str()));
            }
        }
        for path in &self.specs {
            out.push(("specs", path.as_str()));
        }
        for path in &self.adrs {
            out.push(("adrs", path.as_str()));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// A unit of tracked change. `track` and `stage` keep the raw declared text so
/// that out-of-model values survive parsing and can be reported as violations
/// instead of being lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default)]
    pub checkpoint: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub docs: Docs,
}

impl WorkItem {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            id: None,
            description: None,
            track: None,
            stage: None,
            started: None,
            checkpoint: 0,
            branch: None,
            docs: Docs::default(),
        }
    }

    pub fn parsed_track(&self) -> Option<Track> {
        self.track.as_deref().and_then(|t| t.parse().ok())
    }

    pub fn parsed_stage(&self) -> Option<StageState> {
        self.stage.as_deref().and_then(|s| s.parse().ok())
    }

    /// An item is active until its stage is set to DONE; the record itself
    /// persists for historical reference.
    pub fn is_active(&self) -> bool {
        self.stage.as_deref() != Some("DONE")
    }

    /// The source-control branch this item is bound to while active.
    pub fn branch_binding(&self) -> String {
        match &self.branch {
            Some(branch) => branch.clone(),
            None => format!("{BRANCH_PREFIX}{}", self.slug),
        }
    }

    /// True if `token` names this item, by slug or by its external id.
    pub fn matches(&self, token: &str) -> bool {
        self.slug == token || self.id.as_deref() == Some(token)
    }

    /// Check stage/track/checkpoint consistency. Violations are reported,
    /// never thrown; callers decide severity.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        let track = match self.track.as_deref() {
            Some(raw) => match raw.parse::<Track>() {
                Ok(track) => Some(track),
                Err(_) => {
                    violations.push(Violation::UnknownTrack(raw.to_string()));
                    None
                }
            },
            None => {
                violations.push(Violation::MissingTrack);
                None
            }
        };

        let stage = match self.stage.as_deref() {
            Some(raw) => match raw.parse::<StageState>() {
                Ok(state) => Some(state),
                Err(_) => {
                    violations.push(Violation::UnknownStage(raw.to_string()));
                    None
                }
            },
            None => {
                violations.push(Violation::MissingStage);
                None
            }
        };

        if let (Some(track), Some(StageState::At(stage))) = (track, stage) {
            if !track.contains(stage) {
                violations.push(Violation::StageOutsideTrack { stage: stage.as_str().to_string(), track });
            }
        }

        if self.checkpoint > MAX_CHECKPOINT {
            violations.push(Violation::CheckpointOutOfRange(self.checkpoint));
        } else if let (Some(track), Some(state)) = (track, stage) {
            let max = track.max_earned_checkpoint(state);
            if self.checkpoint > max {
                violations.push(Violation::CheckpointAhead {
                    checkpoint: self.checkpoint,
                    max,
                    stage: state.as_str().to_string(),
                });
            }
        }

        violations
    }
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingTrack,
    MissingStage,
    UnknownTrack(String),
    UnknownStage(String),
    StageOutsideTrack { stage: String, track: Track },
    CheckpointOutOfRange(u8),
    CheckpointAhead { checkpoint: u8, max: u8, stage: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingTrack => write!(f, "no track declared"),
            Violation::MissingStage => write!(f, "no stage declared"),
            Violation::UnknownTrack(track) => {
                write!(f, "invalid track '{track}' (must be micro/small/medium/large)")
            }
            Violation::UnknownStage(stage) => write!(f, "invalid stage '{stage}'"),
            Violation::StageOutsideTrack { stage, track } => {
                let valid: Vec<&str> = track.stages().iter().map(|s| s.as_str()).collect();
                write!(
                    f,
                    "stage {stage} is not part of the {track} track (valid stages: {})",
                    valid.join(", ")
                )
            }
            Violation::CheckpointOutOfRange(cp) => {
                write!(f, "checkpoint {cp} is out of range (0-{MAX_CHECKPOINT})")
            }
            Violation::CheckpointAhead { checkpoint, max, stage } => write!(
                f,
                "checkpoint {checkpoint} is ahead of stage {stage} (max earnable: {max})"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;

    fn item(track: &str, stage: &str, checkpoint: u8) -> WorkItem {
        let mut item = WorkItem::new("add-auth");
        item.track = Some(track.to_string());
        item.stage = Some(stage.to_string());
        item.checkpoint = checkpoint;
        item
    }

    #[test]
    fn branch_binding_defaults_to_slug() {
        let item = WorkItem::new("add-auth");
        assert_eq!(item.branch_binding(), "feat/add-auth");
    }

    #[test]
    fn branch_binding_prefers_explicit_branch() {
        let mut item = WorkItem::new("add-auth");
        item.branch = Some("custom/x".to_string());
        assert_eq!(item.branch_binding(), "custom/x");
    }

    #[test]
    fn active_unless_done() {
        let mut item = item("micro", "F", 0);
        assert!(item.is_active());
        item.stage = Some("DONE".to_string());
        assert!(!item.is_active());
        // No declared stage still counts as active
        item.stage = None;
        assert!(item.is_active());
    }

    #[test]
    fn matches_by_slug_or_id() {
        let mut item = WorkItem::new("add-auth");
        item.id = Some("030".to_string());
        assert!(item.matches("add-auth"));
        assert!(item.matches("030"));
        assert!(!item.matches("031"));
    }

    #[test]
    fn validate_clean_item() {
        assert!(item("medium", "G", 3).validate().is_empty());
        assert!(item("micro", "F", 0).validate().is_empty());
        assert!(item("large", "DONE", 6).validate().is_empty());
    }

    #[test]
    fn validate_stage_outside_track() {
        // Every (track, stage) pair outside the track's list is a violation
        for &track in Track::all() {
            for &stage in Stage::all() {
                let violations = item(track.as_str(), stage.as_str(), 0).validate();
                if track.contains(stage) {
                    assert!(
                        !violations
                            .iter()
                            .any(|v| matches!(v, Violation::StageOutsideTrack { .. })),
                        "{track}/{stage} wrongly flagged"
                    );
                } else {
                    assert!(
                        violations
                            .iter()
                            .any(|v| matches!(v, Violation::StageOutsideTrack { .. })),
                        "{track}/{stage} not flagged"
                    );
                }
            }
        }
    }

    #[test]
    fn validate_unknown_track_and_stage() {
        let violations = item("huge", "Z", 0).validate();
        assert!(violations.contains(&Violation::UnknownTrack("huge".to_string())));
        assert!(violations.contains(&Violation::UnknownStage("Z".to_string())));
    }

    #[test]
    fn validate_checkpoint_range() {
        let violations = item("large", "L", 9).validate();
        assert!(violations.contains(&Violation::CheckpointOutOfRange(9)));
    }

    #[test]
    fn validate_checkpoint_ahead_of_stage() {
        // Medium at F has earned at most checkpoint 2 (D and E gates)
        let violations = item("medium", "F", 3).validate();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::CheckpointAhead { checkpoint: 3, max: 2, .. })));
        assert!(item("medium", "F", 2).validate().is_empty());
    }

    #[test]
    fn violation_messages_name_specifics() {
        let text = Violation::StageOutsideTrack {
            stage: "A".to_string(),
            track: Track::Micro,
        }
        .to_string();
        assert!(text.contains("A"));
        assert!(text.contains("micro"));
        assert!(text.contains("F, G"));
    }
}
