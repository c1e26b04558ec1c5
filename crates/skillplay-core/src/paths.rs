use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLAYGROUND_DIR: &str = ".skillplay";
pub const STORE_DIR: &str = ".skillplay/store";
pub const EXPORTS_DIR: &str = ".skillplay/exports";

pub const CONFIG_FILE: &str = ".skillplay/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn playground_dir(root: &Path) -> PathBuf {
    root.join(PLAYGROUND_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn store_dir(root: &Path) -> PathBuf {
    root.join(STORE_DIR)
}

pub fn exports_dir(root: &Path) -> PathBuf {
    root.join(EXPORTS_DIR)
}

/// File backing a single storage key. Keys are plain slugs like `history`.
pub fn store_entry(root: &Path, key: &str) -> PathBuf {
    store_dir(root).join(format!("{key}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_entry_is_under_store_dir() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            store_entry(root, "history"),
            PathBuf::from("/tmp/proj/.skillplay/store/history.json")
        );
    }
}
