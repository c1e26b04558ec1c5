use crate::cmd::history::find;
use crate::cmd::open_storage;
use crate::output::print_json;
use anyhow::Context;
use serde_json::json;
use skillplay_core::{export, history::HistoryStore};
use std::path::Path;

pub fn run(
    root: &Path,
    run_id: &str,
    out: Option<&Path>,
    save: bool,
    json: bool,
) -> anyhow::Result<()> {
    let history = HistoryStore::load(open_storage(root));
    let item = find(&history, run_id)?;
    let text = export::result_of(&item)?;

    let target = match (out, save) {
        (Some(path), _) => path.to_path_buf(),
        (None, true) => export::default_export_path(root, &item.id),
        (None, false) => {
            println!("{text}");
            return Ok(());
        }
    };

    let written = export::download_result(&target, text)
        .with_context(|| format!("failed to write {}", target.display()))?;
    if json {
        print_json(&json!({ "path": written }))
    } else {
        println!("Wrote {}", written.display());
        Ok(())
    }
}
