//! Thin git queries. Every call is bounded and every failure degrades to
//! None/empty so callers can fall back instead of erroring.

use crate::proc;
use std::path::{Path, PathBuf};
use std::time::Duration;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);

fn git(cwd: &Path, args: &[&str]) -> Option<String> {
    let out = proc::run_with_timeout("git", args, cwd, GIT_TIMEOUT)?;
    if !out.success() {
        return None;
    }
    let text = out.stdout.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Repository toplevel containing `cwd`, if any.
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    git(cwd, &["rev-parse", "--show-toplevel"]).map(PathBuf::from)
}

/// Current branch name. None in detached-HEAD state or outside a repository.
pub fn current_branch(cwd: &Path) -> Option<String> {
    let branch = git(cwd, &["branch", "--show-current"])?;
    Some(branch.lines().next().unwrap_or_default().to_string())
}

/// Paths changed relative to HEAD (staged and unstaged), repo-relative.
pub fn changed_files(cwd: &Path) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for args in [
        ["diff", "--name-only", "HEAD"].as_slice(),
        ["ls-files", "--others", "--exclude-standard"].as_slice(),
    ] {
        if let Some(out) = git(cwd, args) {
            files.extend(out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()));
        }
    }
    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        for args in [
            vec!["init", "-q", "-b", "main"],
            vec!["config", "user.email", "t@example.com"],
            vec!["config", "user.name", "t"],
        ] {
            let ok = Command::new("git")
                .args(&args)
                .current_dir(dir.path())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            assert!(ok, "git {args:?} failed");
        }
        dir
    }

    #[test]
    fn outside_repo_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(current_branch(dir.path()).is_none() || project_root(dir.path()).is_some());
    }

    #[test]
    fn branch_and_root_in_fresh_repo() {
        let dir = init_repo();
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(
            project_root(dir.path()).unwrap().canonicalize().unwrap(),
            canonical
        );
        assert_eq!(current_branch(dir.path()).as_deref(), Some("main"));
    }

    #[test]
    fn untracked_files_show_as_changed() {
        let dir = init_repo();
        std::fs::create_dir_all(dir.path().join("docs/specs")).unwrap();
        std::fs::write(dir.path().join("docs/specs/spec-auth.md"), "x").unwrap();
        let files = changed_files(dir.path());
        assert!(files.contains(&"docs/specs/spec-auth.md".to_string()), "{files:?}");
    }
}
