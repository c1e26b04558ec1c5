use crate::clipboard::StdoutClipboard;
use crate::cmd::{format_map, load_config, masked, open_location, open_storage};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use serde_json::json;
use skillplay_core::{
    export,
    history::{ExecutionHistoryItem, HistoryStore},
    ports::{save_last_config, ShareLinkPort},
    share, PlaygroundError,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum HistorySubcommand {
    /// List past runs, newest first
    List,
    /// Show a run's configuration and transcript
    Show { run_id: String },
    /// Delete all run history
    Clear,
    /// Restore a run's configuration as the last-used one and print its share link
    Load { run_id: String },
}

pub fn run(root: &Path, subcmd: HistorySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        HistorySubcommand::List => list(root, json),
        HistorySubcommand::Show { run_id } => show(root, &run_id, json),
        HistorySubcommand::Clear => clear(root, json),
        HistorySubcommand::Load { run_id } => load(root, &run_id, json),
    }
}

pub fn find(history: &HistoryStore, run_id: &str) -> anyhow::Result<ExecutionHistoryItem> {
    history
        .get(run_id)
        .cloned()
        .ok_or_else(|| PlaygroundError::RunNotFound(run_id.to_string()).into())
}

fn duration(item: &ExecutionHistoryItem) -> String {
    match item.finished_at {
        Some(end) => {
            let ms = (end - item.started_at).num_milliseconds().max(0);
            format!("{:.1}s", ms as f64 / 1000.0)
        }
        None => "-".to_string(),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let history = HistoryStore::load(open_storage(root));

    if json {
        let shown: Vec<ExecutionHistoryItem> = history
            .list()
            .iter()
            .map(|item| ExecutionHistoryItem {
                config: masked(&item.config),
                ..item.clone()
            })
            .collect();
        return print_json(&shown);
    }
    if history.list().is_empty() {
        println!("No runs yet.");
        return Ok(());
    }

    let rows = history
        .list()
        .iter()
        .map(|item| {
            vec![
                item.id.clone(),
                item.status.to_string(),
                item.config.skill_id.clone(),
                item.config.model.clone(),
                item.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                duration(item),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "SKILL", "MODEL", "STARTED", "DURATION"], rows);
    Ok(())
}

fn show(root: &Path, run_id: &str, json: bool) -> anyhow::Result<()> {
    let history = HistoryStore::load(open_storage(root));
    let item = find(&history, run_id)?;

    if json {
        let shown = ExecutionHistoryItem {
            config: masked(&item.config),
            ..item
        };
        return print_json(&shown);
    }

    println!("id:         {}", item.id);
    println!("status:     {}", item.status);
    println!("skill:      {}", item.config.skill_id);
    println!("model:      {}", item.config.model);
    println!("parameters: {}", format_map(&item.config.parameters, false));
    println!("env:        {}", format_map(&item.config.env, true));
    println!("started:    {}", item.started_at.to_rfc3339());
    if let Some(finished) = item.finished_at {
        println!("finished:   {}", finished.to_rfc3339());
    }
    if !item.terminal_log.is_empty() {
        println!();
        println!("{}", item.terminal_log);
    }
    Ok(())
}

fn clear(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut history = HistoryStore::load(open_storage(root));
    let removed = history.list().len();
    history.clear();

    if json {
        print_json(&json!({ "cleared": removed }))?;
    } else {
        println!("Cleared {removed} run(s).");
    }
    Ok(())
}

fn load(root: &Path, run_id: &str, json: bool) -> anyhow::Result<()> {
    let settings = load_config(root)?;
    let storage = open_storage(root);
    let history = HistoryStore::load(storage.clone());
    let config = find(&history, run_id)?.config;

    save_last_config(storage.as_ref(), &config);

    let location = open_location(&settings, None);
    if json {
        let link = share::share_url(&location.origin(), &config);
        return print_json(&json!({ "config": masked(&config), "link": link }));
    }
    export::copy_share_link(&StdoutClipboard, &location, &config);
    Ok(())
}
