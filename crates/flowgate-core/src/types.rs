use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step in the fixed global workflow sequence A..L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::A,
            Stage::B,
            Stage::C,
            Stage::D,
            Stage::E,
            Stage::F,
            Stage::G,
            Stage::H,
            Stage::I,
            Stage::J,
            Stage::K,
            Stage::L,
        ]
    }

    /// Position in the global stage order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::A => "A",
            Stage::B => "B",
            Stage::C => "C",
            Stage::D => "D",
            Stage::E => "E",
            Stage::F => "F",
            Stage::G => "G",
            Stage::H => "H",
            Stage::I => "I",
            Stage::J => "J",
            Stage::K => "K",
            Stage::L => "L",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::A => "Initiate",
            Stage::B => "Discovery",
            Stage::C => "Specify",
            Stage::D => "Decide",
            Stage::E => "Plan",
            Stage::F => "RED",
            Stage::G => "GREEN",
            Stage::H => "REFACTOR",
            Stage::I => "Reconcile",
            Stage::J => "Prepare",
            Stage::K => "Deploy",
            Stage::L => "Close",
        }
    }

    /// Checkpoint that must be held before an item may advance past this
    /// stage. Stages without an entry require none.
    pub fn required_checkpoint(self) -> Option<u8> {
        match self {
            Stage::D => Some(1),
            Stage::E => Some(2),
            Stage::F => Some(3),
            Stage::H => Some(4),
            Stage::J => Some(5),
            Stage::L => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::FlowgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::all()
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| crate::error::FlowgateError::InvalidStage(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// StageState
// ---------------------------------------------------------------------------

/// A work item's declared position: either a workflow stage or the terminal
/// `DONE` sentinel that excludes the item from all active queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    At(Stage),
    Done,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            StageState::At(stage) => stage.as_str(),
            StageState::Done => "DONE",
        }
    }

    pub fn stage(self) -> Option<Stage> {
        match self {
            StageState::At(stage) => Some(stage),
            StageState::Done => None,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageState {
    type Err = crate::error::FlowgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "DONE" {
            return Ok(StageState::Done);
        }
        s.parse::<Stage>().map(StageState::At)
    }
}

impl Serialize for StageState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// A named subset and ordering of stages appropriate to a change's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Micro,
    Small,
    Medium,
    Large,
}

impl Track {
    pub fn all() -> &'static [Track] {
        &[Track::Micro, Track::Small, Track::Medium, Track::Large]
    }

    /// The ordered stage subset for this track.
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Track::Micro => &[Stage::F, Stage::G],
            Track::Small => &[Stage::E, Stage::F, Stage::G, Stage::H],
            Track::Medium => &[
                Stage::B,
                Stage::C,
                Stage::D,
                Stage::E,
                Stage::F,
                Stage::G,
                Stage::H,
                Stage::I,
                Stage::J,
            ],
            Track::Large => Stage::all(),
        }
    }

    pub fn first_stage(self) -> Stage {
        self.stages()[0]
    }

    pub fn contains(self, stage: Stage) -> bool {
        self.stages().contains(&stage)
    }

    /// The stage immediately following `current` within this track, or None
    /// if `current` is terminal for the track (or not part of it).
    pub fn next_stage(self, current: Stage) -> Option<Stage> {
        let stages = self.stages();
        let pos = stages.iter().position(|&s| s == current)?;
        stages.get(pos + 1).copied()
    }

    /// Highest checkpoint an item at `state` could legitimately hold: the
    /// maximum gate value among this track's stages strictly before it.
    pub fn max_earned_checkpoint(self, state: StageState) -> u8 {
        let cutoff = match state {
            StageState::At(stage) => stage.index(),
            StageState::Done => usize::MAX,
        };
        self.stages()
            .iter()
            .filter(|s| s.index() < cutoff)
            .filter_map(|s| s.required_checkpoint())
            .max()
            .unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Track::Micro => "micro",
            Track::Small => "small",
            Track::Medium => "medium",
            Track::Large => "large",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Track::Micro => "Bug fix, typo, small refactor",
            Track::Small => "Single feature, no contracts",
            Track::Medium => "Multi-component, no new services",
            Track::Large => "System change, new contracts/services",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Track {
    type Err = crate::error::FlowgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "micro" => Ok(Track::Micro),
            "small" => Ok(Track::Small),
            "medium" => Ok(Track::Medium),
            "large" => Ok(Track::Large),
            _ => Err(crate::error::FlowgateError::InvalidTrack(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

pub const MAX_CHECKPOINT: u8 = 6;

/// Checkpoint required before an item may be closed, independent of track.
pub const CLOSE_CHECKPOINT: u8 = 4;

pub fn checkpoint_name(checkpoint: u8) -> &'static str {
    match checkpoint {
        1 => "Planning Complete",
        2 => "Design Complete",
        3 => "Tests Complete",
        4 => "Implementation Complete",
        5 => "Release Ready",
        6 => "Deployed",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering() {
        assert!(Stage::A < Stage::B);
        assert!(Stage::F < Stage::G);
        assert!(Stage::L > Stage::J);
        assert_eq!(Stage::A.index(), 0);
        assert_eq!(Stage::L.index(), 11);
    }

    #[test]
    fn stage_roundtrip() {
        for &stage in Stage::all() {
            let parsed: Stage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert!("Z".parse::<Stage>().is_err());
        assert!("".parse::<Stage>().is_err());
    }

    #[test]
    fn stage_state_parses_done() {
        assert_eq!("DONE".parse::<StageState>().unwrap(), StageState::Done);
        assert_eq!(
            "G".parse::<StageState>().unwrap(),
            StageState::At(Stage::G)
        );
        assert!("done".parse::<StageState>().is_err());
    }

    #[test]
    fn checkpoint_table() {
        assert_eq!(Stage::D.required_checkpoint(), Some(1));
        assert_eq!(Stage::E.required_checkpoint(), Some(2));
        assert_eq!(Stage::F.required_checkpoint(), Some(3));
        assert_eq!(Stage::H.required_checkpoint(), Some(4));
        assert_eq!(Stage::J.required_checkpoint(), Some(5));
        assert_eq!(Stage::L.required_checkpoint(), Some(6));
        for stage in [Stage::A, Stage::B, Stage::C, Stage::G, Stage::I, Stage::K] {
            assert_eq!(stage.required_checkpoint(), None);
        }
    }

    #[test]
    fn track_stage_subsets() {
        assert_eq!(Track::Micro.stages(), &[Stage::F, Stage::G]);
        assert_eq!(Track::Small.first_stage(), Stage::E);
        assert_eq!(Track::Medium.stages().len(), 9);
        assert_eq!(Track::Large.stages(), Stage::all());
        assert!(!Track::Micro.contains(Stage::A));
        assert!(Track::Medium.contains(Stage::J));
    }

    #[test]
    fn next_stage_within_track() {
        assert_eq!(Track::Micro.next_stage(Stage::F), Some(Stage::G));
        assert_eq!(Track::Micro.next_stage(Stage::G), None);
        assert_eq!(Track::Medium.next_stage(Stage::H), Some(Stage::I));
        // A stage outside the track has no successor in it
        assert_eq!(Track::Micro.next_stage(Stage::A), None);
        assert_eq!(Track::Large.next_stage(Stage::K), Some(Stage::L));
        assert_eq!(Track::Large.next_stage(Stage::L), None);
    }

    #[test]
    fn max_earned_checkpoint_by_position() {
        // Micro at F has passed nothing gated yet
        assert_eq!(Track::Micro.max_earned_checkpoint(StageState::At(Stage::F)), 0);
        // Micro at G has passed F's gate (#3)
        assert_eq!(Track::Micro.max_earned_checkpoint(StageState::At(Stage::G)), 3);
        // Medium at G has passed D (#1), E (#2), F (#3)
        assert_eq!(Track::Medium.max_earned_checkpoint(StageState::At(Stage::G)), 3);
        // Large done has passed everything
        assert_eq!(Track::Large.max_earned_checkpoint(StageState::Done), 6);
        assert_eq!(Track::Medium.max_earned_checkpoint(StageState::Done), 5);
    }

    #[test]
    fn track_roundtrip() {
        for &track in Track::all() {
            let parsed: Track = track.as_str().parse().unwrap();
            assert_eq!(parsed, track);
        }
        assert!("huge".parse::<Track>().is_err());
    }

    #[test]
    fn checkpoint_names() {
        assert_eq!(checkpoint_name(4), "Implementation Complete");
        assert_eq!(checkpoint_name(0), "Unknown");
        assert_eq!(checkpoint_name(7), "Unknown");
    }
}
