use std::path::{Path, PathBuf};

/// Resolve the playground root directory.
///
/// Priority:
/// 1. `--root` flag / `SKILLPLAY_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.skillplay/`
/// 3. The user's home directory
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Some(found) = find_playground(&cwd) {
        return found;
    }

    home::home_dir().unwrap_or(cwd)
}

fn find_playground(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| skillplay_core::paths::playground_dir(dir).is_dir())
        .map(Path::to_path_buf)
}
