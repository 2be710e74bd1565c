use flowgate_core::{git, paths};
use std::path::{Path, PathBuf};

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `FLOWGATE_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `docs/workflow-state.yaml`
/// 3. Ask git for the repository toplevel
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut dir = cwd.clone();
    loop {
        if paths::manifest_path(&dir).is_file() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    if let Some(toplevel) = git::project_root(&cwd) {
        return toplevel;
    }

    cwd
}
