//! Copy-link, copy-result and download-result actions.
//!
//! Clipboard and location writes are best-effort: a refusal is logged and the
//! action still reports what it would have written. Downloads go through the
//! filesystem and do return errors, since the caller asked for a file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PlaygroundError, Result};
use crate::history::ExecutionHistoryItem;
use crate::paths;
use crate::ports::{ClipboardPort, ShareLinkPort};
use crate::run_config::RunConfig;
use crate::share;

/// Build the absolute share link for `config`, put it on the clipboard and
/// mirror its query into the location. Returns the link.
pub fn copy_share_link(
    clipboard: &dyn ClipboardPort,
    location: &dyn ShareLinkPort,
    config: &RunConfig,
) -> String {
    let link = share::share_url(&location.origin(), config);
    if let Err(e) = clipboard.write_text(&link) {
        warn!(error = %e, "failed to copy share link");
    }
    sync_location(location, config);
    link
}

/// Replace the location query with the share query for `config`.
pub fn sync_location(location: &dyn ShareLinkPort, config: &RunConfig) {
    let query = share::share_query(config);
    match location.replace_query(&query) {
        Ok(()) => debug!(%query, "location updated"),
        Err(e) => warn!(error = %e, "failed to update location"),
    }
}

/// Put raw result JSON on the clipboard. Returns `false` if the clipboard
/// refused it.
pub fn copy_result(clipboard: &dyn ClipboardPort, text: &str) -> bool {
    match clipboard.write_text(text) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "failed to copy result");
            false
        }
    }
}

/// The stored result of a history entry. Cancelled runs have none.
pub fn result_of(item: &ExecutionHistoryItem) -> Result<&str> {
    if item.result.is_empty() {
        return Err(PlaygroundError::NoResult(item.id.clone()));
    }
    Ok(&item.result)
}

pub fn result_file_name(run_id: &str) -> String {
    format!("skillplay-result-{run_id}.json")
}

/// Where a result lands when no explicit path is given.
pub fn default_export_path(root: &Path, run_id: &str) -> PathBuf {
    paths::exports_dir(root).join(result_file_name(run_id))
}

pub fn download_result(path: &Path, text: &str) -> Result<PathBuf> {
    crate::io::atomic_write(path, text.as_bytes())?;
    debug!(path = %path.display(), "result written");
    Ok(path.to_path_buf())
}
