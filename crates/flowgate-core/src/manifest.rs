//! The persisted work-item manifest and its hand-rolled parser.
//!
//! The manifest is a constrained structured-text file with one fixed nesting
//! shape (see [`Manifest::parse`]); it is deliberately not fed through a
//! general YAML parser. Every consumer must fail open, so parsing never
//! returns an error: lines that cannot be classified are skipped, and a file
//! that yields nothing is indistinguishable from a missing one.

use crate::error::Result;
use crate::paths;
use crate::workitem::WorkItem;
use std::fmt::Write as _;
use std::path::Path;

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// All work items recovered from the manifest, in file order. File order is
/// load-bearing: branch-binding ties resolve to the later item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub items: Vec<WorkItem>,
}

impl Manifest {
    /// Read and parse the manifest at `path`. Returns None when the file is
    /// missing or unreadable; callers treat that the same as an empty one.
    pub fn load(path: &Path) -> Option<Manifest> {
        let text = std::fs::read_to_string(path).ok()?;
        Some(Manifest::parse(&text))
    }

    pub fn load_from_root(root: &Path) -> Option<Manifest> {
        Manifest::load(&paths::manifest_path(root))
    }

    /// Serialize back to the manifest grammar and write atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::io::atomic_write(path, self.to_yaml().as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.slug == slug)
    }

    /// Find by slug or external id. Ids are not guaranteed unique; the last
    /// declared match wins, mirroring binding tie resolution.
    pub fn find(&self, token: &str) -> Option<&WorkItem> {
        self.items.iter().filter(|item| item.matches(token)).last()
    }

    pub fn active(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse manifest text. Grammar:
    ///
    /// ```text
    /// workitems:
    ///   <slug>:                  2 spaces; [a-z0-9-] key, no value
    ///     <field>: <value>       4 spaces; scalar fields
    ///     docs:                  4 spaces; opens the docs sub-record
    ///       <field>: <value>     6 spaces; scalar doc fields
    ///       specs:               6 spaces, empty value; opens a list field
    ///         - <value>          8 spaces; appends to the open list
    /// ```
    ///
    /// Everything before `workitems:` is ignored. Inline `#` comments and
    /// surrounding quotes are stripped from values; integer-looking
    /// checkpoint values parse as integers. Duplicate fields within a record
    /// resolve to the last occurrence. Malformed lines are skipped.
    pub fn parse(text: &str) -> Manifest {
        let mut items: Vec<WorkItem> = Vec::new();
        let mut current: Option<WorkItem> = None;
        let mut in_workitems = false;
        let mut in_docs = false;
        let mut list_field: Option<ListField> = None;

        for raw in text.lines() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed == "workitems:" && !in_workitems {
                in_workitems = true;
                continue;
            }
            if !in_workitems {
                continue;
            }

            match leading_spaces(line) {
                // New work item record
                2 => {
                    list_field = None;
                    in_docs = false;
                    if let Some(done) = current.take() {
                        commit(&mut items, done);
                    }
                    if let Some(key) = trimmed.strip_suffix(':') {
                        if paths::is_slug(key) {
                            current = Some(WorkItem::new(key));
                        }
                    }
                    // Anything else at this indent is malformed; the block
                    // beneath it is unreachable until the next valid slug.
                }
                // Scalar field or docs: opener
                4 => {
                    list_field = None;
                    let Some(item) = current.as_mut() else { continue };
                    if trimmed == "docs:" {
                        in_docs = true;
                        continue;
                    }
                    in_docs = false;
                    let Some((key, value)) = split_field(trimmed) else { continue };
                    set_scalar(item, key, &value);
                }
                // Docs scalar or list opener
                6 if in_docs => {
                    list_field = None;
                    let Some(item) = current.as_mut() else { continue };
                    let Some((key, value)) = split_field(trimmed) else { continue };
                    match key {
                        "specs" if value.is_empty() => {
                            item.docs.specs.clear();
                            list_field = Some(ListField::Specs);
                        }
                        "adrs" if value.is_empty() => {
                            item.docs.adrs.clear();
                            list_field = Some(ListField::Adrs);
                        }
                        "prd" => item.docs.prd = scalar_or_null(&value),
                        "discovery" => item.docs.discovery = scalar_or_null(&value),
                        "feature" => item.docs.feature = scalar_or_null(&value),
                        "opnote" => item.docs.opnote = scalar_or_null(&value),
                        _ => {}
                    }
                }
                // List item under an open specs:/adrs: field
                8 if list_field.is_some() => {
                    let Some(entry) = trimmed.strip_prefix("- ") else {
                        list_field = None;
                        continue;
                    };
                    let value = strip_quotes(entry.trim()).to_string();
                    if value.is_empty() {
                        continue;
                    }
                    let Some(item) = current.as_mut() else { continue };
                    match list_field {
                        Some(ListField::Specs) => item.docs.specs.push(value),
                        Some(ListField::Adrs) => item.docs.adrs.push(value),
                        None => {}
                    }
                }
                // Structural anomaly: skip the line, close any open list.
                _ => {
                    list_field = None;
                }
            }
        }

        if let Some(done) = current.take() {
            commit(&mut items, done);
        }

        Manifest { items }
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Emit the exact grammar `parse` accepts; parse → to_yaml → parse is
    /// stable for well-formed manifests.
    pub fn to_yaml(&self) -> String {
        let mut out = String::from("workitems:\n");
        for item in &self.items {
            let _ = writeln!(out, "  {}:", item.slug);
            if let Some(id) = &item.id {
                let _ = writeln!(out, "    id: {id}");
            }
            if let Some(description) = &item.description {
                let _ = writeln!(out, "    description: \"{description}\"");
            }
            if let Some(track) = &item.track {
                let _ = writeln!(out, "    track: {track}");
            }
            if let Some(stage) = &item.stage {
                let _ = writeln!(out, "    stage: {stage}");
            }
            if let Some(started) = &item.started {
                let _ = writeln!(out, "    started: {started}");
            }
            let _ = writeln!(out, "    checkpoint: {}", item.checkpoint);
            if let Some(branch) = &item.branch {
                let _ = writeln!(out, "    branch: {branch}");
            }
            if !item.docs.is_empty() {
                out.push_str("    docs:\n");
                for (name, value) in [
                    ("prd", &item.docs.prd),
                    ("discovery", &item.docs.discovery),
                ] {
                    if let Some(path) = value {
                        let _ = writeln!(out, "      {name}: {path}");
                    }
                }
                if !item.docs.specs.is_empty() {
                    out.push_str("      specs:\n");
                    for path in &item.docs.specs {
                        let _ = writeln!(out, "        - {path}");
                    }
                }
                if !item.docs.adrs.is_empty() {
                    out.push_str("      adrs:\n");
                    for path in &item.docs.adrs {
                        let _ = writeln!(out, "        - {path}");
                    }
                }
                for (name, value) in [
                    ("feature", &item.docs.feature),
                    ("opnote", &item.docs.opnote),
                ] {
                    if let Some(path) = value {
                        let _ = writeln!(out, "      {name}: {path}");
                    }
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Parser internals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum ListField {
    Specs,
    Adrs,
}

fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|&c| c == ' ').count()
}

/// Split `key: value`, cleaning the value (comment and quote stripping).
/// Returns None when the line carries no colon.
fn split_field(trimmed: &str) -> Option<(&str, String)> {
    let (key, rest) = trimmed.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let mut value = rest;
    if let Some(pos) = value.find('#') {
        value = &value[..pos];
    }
    Some((key, strip_quotes(value.trim()).to_string()))
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn scalar_or_null(value: &str) -> Option<String> {
    match value {
        "" | "null" | "~" => None,
        other => Some(other.to_string()),
    }
}

fn set_scalar(item: &mut WorkItem, key: &str, value: &str) {
    match key {
        "id" => item.id = scalar_or_null(value),
        "description" => item.description = scalar_or_null(value),
        "track" => item.track = scalar_or_null(value),
        "stage" => item.stage = scalar_or_null(value),
        "started" => item.started = scalar_or_null(value),
        "branch" => item.branch = scalar_or_null(value),
        "checkpoint" => {
            item.checkpoint = value.parse::<i64>().unwrap_or(0).clamp(0, 255) as u8;
        }
        _ => {}
    }
}

/// Commit a finished record. A repeated slug replaces the earlier record in
/// place, keeping its original position in file order.
fn commit(items: &mut Vec<WorkItem>, item: WorkItem) {
    if let Some(existing) = items.iter_mut().find(|i| i.slug == item.slug) {
        *existing = item;
    } else {
        items.push(item);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
