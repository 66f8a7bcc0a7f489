use std::path::{Path, PathBuf};

/// Walk upward from `start` and return the first directory containing `marker`.
fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `SPRINT_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of the working directory with `docs/plans/`
/// 3. Nearest ancestor with `.git/`
/// 4. The working directory itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(cwd: &Path) -> PathBuf {
    find_upward(cwd, sprint_core::paths::PLANS_DIR)
        .or_else(|| find_upward(cwd, ".git"))
        .unwrap_or_else(|| cwd.to_path_buf())
}
