use crate::error::{FlowgateError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Path constants
// ---------------------------------------------------------------------------

pub const DOCS_DIR: &str = "docs";
pub const MANIFEST_FILE: &str = "docs/workflow-state.yaml";

pub const PRD_FILE: &str = "docs/prds/prd.md";
pub const DISCOVERY_DIR: &str = "docs/discovery";
pub const SPECS_DIR: &str = "docs/specs";
pub const ADRS_DIR: &str = "docs/adrs";
pub const FEATURES_DIR: &str = "docs/features";
pub const OPNOTES_DIR: &str = "docs/op-notes";

/// External checkpoint validator, resolved relative to the project root.
pub const VALIDATOR_SCRIPT: &str = "scripts/validate_checkpoint.py";

/// Branch prefix implied for items with no explicit `branch` field.
pub const BRANCH_PREFIX: &str = "feat/";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

pub fn prd_path(root: &Path) -> PathBuf {
    root.join(PRD_FILE)
}

pub fn discovery_dir(root: &Path) -> PathBuf {
    root.join(DISCOVERY_DIR)
}

pub fn specs_dir(root: &Path) -> PathBuf {
    root.join(SPECS_DIR)
}

pub fn adrs_dir(root: &Path) -> PathBuf {
    root.join(ADRS_DIR)
}

pub fn features_dir(root: &Path) -> PathBuf {
    root.join(FEATURES_DIR)
}

pub fn opnotes_dir(root: &Path) -> PathBuf {
    root.join(OPNOTES_DIR)
}

pub fn validator_script(root: &Path) -> PathBuf {
    root.join(VALIDATOR_SCRIPT)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// True if `s` is a well-formed work item slug.
pub fn is_slug(s: &str) -> bool {
    !s.is_empty() && s.len() <= 64 && slug_re().is_match(s)
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if !is_slug(slug) {
        return Err(FlowgateError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
