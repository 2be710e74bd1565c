//! Drift verification: recompute a work item's stage from file-system
//! evidence and compare it against the manifest's claim. Read-only and
//! diagnostic; the manifest is never mutated here.

use crate::paths;
use crate::types::{Stage, StageState, Track};
use crate::workitem::WorkItem;
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Artifact scan
// ---------------------------------------------------------------------------

/// Observable workflow artifacts under a project root. Paths are
/// root-relative, sorted for stable output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactScan {
    pub prd: Option<String>,
    pub discovery: Vec<String>,
    pub specs: Vec<String>,
    pub adrs: Vec<String>,
    pub features: Vec<String>,
    pub opnotes: Vec<String>,
    pub tests: Vec<String>,
}

impl ArtifactScan {
    /// Scan `root` for workflow artifacts. With an `id`, only artifacts
    /// named for that work item count (specs are shared and never filtered).
    pub fn gather(root: &Path, id: Option<&str>) -> Self {
        let by_id = |base: &str| match id {
            Some(id) => format!("{base}-{id}"),
            None => format!("{base}-"),
        };
        ArtifactScan {
            prd: paths::prd_path(root)
                .is_file()
                .then(|| paths::PRD_FILE.to_string()),
            discovery: md_files(&paths::discovery_dir(root), root, &by_id("disco"), &[]),
            specs: md_files(&paths::specs_dir(root), root, "spec-", &["index.md"]),
            adrs: md_files(&paths::adrs_dir(root), root, &by_id("adr"), &[]),
            features: match id {
                Some(id) => md_files(&paths::features_dir(root), root, &format!("ft-{id}-"), &[]),
                None => md_files(&paths::features_dir(root), root, "ft-", &["schedule.md"]),
            },
            opnotes: md_files(&paths::opnotes_dir(root), root, &by_id("op"), &["index.md"]),
            tests: test_files(root),
        }
    }

    /// Most advanced stage supported by the artifacts present, scanning from
    /// most advanced to least. None means no evidence at all.
    pub fn detect_stage(&self) -> Option<Stage> {
        if !self.opnotes.is_empty() {
            Some(Stage::J)
        } else if !self.tests.is_empty() {
            Some(Stage::G)
        } else if !self.features.is_empty() {
            Some(Stage::E)
        } else if !self.adrs.is_empty() {
            Some(Stage::D)
        } else if !self.specs.is_empty() {
            Some(Stage::C)
        } else if !self.discovery.is_empty() {
            Some(Stage::B)
        } else if self.prd.is_some() {
            Some(Stage::A)
        } else {
            None
        }
    }

    /// Stage to work toward next, in the global order.
    pub fn next_stage(&self) -> Option<Stage> {
        match self.detect_stage() {
            None => Some(Stage::A),
            Some(stage) => Stage::all().get(stage.index() + 1).copied(),
        }
    }

    /// Track suggested by which artifact kinds exist.
    pub fn suggest_track(&self) -> Track {
        if self.prd.is_some() {
            if self.discovery.is_empty() {
                Track::Medium
            } else {
                Track::Large
            }
        } else if !self.discovery.is_empty() {
            Track::Medium
        } else if !self.features.is_empty() {
            Track::Small
        } else {
            Track::Micro
        }
    }
}

fn md_files(dir: &Path, root: &Path, prefix: &str, exclude: &[&str]) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(prefix) || !name.ends_with(".md") {
                return None;
            }
            if exclude.contains(&name.as_str()) {
                return None;
            }
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules", "__pycache__", ".venv"];

fn test_files(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    walk_tests(root, root, false, &mut found);
    found.sort();
    found.dedup();
    found
}

fn walk_tests(dir: &Path, root: &Path, in_tests_dir: bool, found: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if SKIP_DIRS.contains(&name.as_str()) {
                continue;
            }
            walk_tests(&path, root, in_tests_dir || name == "tests", found);
        } else if is_test_file(&name, in_tests_dir) {
            if let Ok(rel) = path.strip_prefix(root) {
                found.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
}

fn is_test_file(name: &str, in_tests_dir: bool) -> bool {
    let code = name.ends_with(".py") || name.ends_with(".rs");
    if !code {
        return false;
    }
    in_tests_dir
        || name.starts_with("test_")
        || name.ends_with("_test.py")
        || name.ends_with("_test.rs")
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Per-item verification result.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub workitem: String,
    pub manifest_stage: Option<String>,
    pub manifest_track: Option<String>,
    pub detected_stage: Option<Stage>,
    pub issues: Vec<String>,
    pub ok: bool,
}

/// Cross-check one item's declared state against on-disk artifacts.
///
/// Any declared stage past the global initial stage `A` implies artifacts,
/// DONE included: a finished item with nothing on disk is as suspect as an
/// in-flight one.
pub fn verify_item(root: &Path, item: &WorkItem) -> VerifyReport {
    let scan = ArtifactScan::gather(root, item.id.as_deref());
    let detected = scan.detect_stage();
    let mut issues = Vec::new();

    let declared = item.stage.as_deref().unwrap_or("?");
    if detected.is_none() && declared != "A" {
        issues.push(format!(
            "manifest says stage {declared} but no artifacts found"
        ));
    }
    if let (Some(StageState::At(stage)), Some(detected)) = (item.parsed_stage(), detected) {
        if stage.index() > detected.index() + 1 {
            issues.push(format!(
                "manifest stage {stage} is ahead of detected artifacts (stage {detected})"
            ));
        }
    }

    for violation in item.validate() {
        issues.push(violation.to_string());
    }

    for (field, path) in item.docs.all_paths() {
        if !root.join(path).exists() {
            issues.push(format!("docs.{field} path does not exist: {path}"));
        }
    }

    let ok = issues.is_empty();
    VerifyReport {
        workitem: item.slug.clone(),
        manifest_stage: item.stage.clone(),
        manifest_track: item.track.clone(),
        detected_stage: detected,
        issues,
        ok,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
