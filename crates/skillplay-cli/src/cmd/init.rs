use crate::output::print_json;
use anyhow::Context;
use serde_json::json;
use skillplay_core::{config::Config, paths};
use std::path::Path;

/// Create `.skillplay/` and a default `config.yaml`. An existing config is
/// left as it is.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let dir = paths::playground_dir(root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let created = !config_path.exists();
    if created {
        Config::default()
            .save(root)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }

    if json {
        return print_json(&json!({ "config": config_path, "created": created }));
    }
    if created {
        println!("Initialized playground in {}", dir.display());
    } else {
        println!("Config already present at {}", config_path.display());
    }
    Ok(())
}
