pub mod history;
pub mod init;
pub mod result;
pub mod run;
pub mod share;
pub mod skills;

use anyhow::{bail, Context};
use clap::Args;
use skillplay_core::{
    config::Config,
    ports::{load_last_config, FileStore, MemoryLocation, PersistencePort, ShareLinkPort},
    resolve::{resolve_initial, ConfigSource},
    result::{mask, mask_env},
    run_config::{from_config, parse_row, to_config, RunConfig, StringMap},
    share::{query_of, ShareQuery},
};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Flags that build a run configuration on top of the resolved starting point.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Skill to run
    #[arg(long)]
    pub skill: Option<String>,

    /// Model to run the skill with
    #[arg(long)]
    pub model: Option<String>,

    /// Parameter assignment, repeatable
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Environment assignment, repeatable
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Start from a share link instead of the last-used configuration
    #[arg(long, value_name = "URL")]
    pub link: Option<String>,
}

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load .skillplay/config.yaml")
}

pub fn open_storage(root: &Path) -> Arc<dyn PersistencePort> {
    Arc::new(FileStore::new(root))
}

/// The location for this invocation: the configured origin with the query
/// of `--link`, if one was given. A terminal has no address bar, so anything
/// written back to it lives only as long as the command.
pub fn open_location(settings: &Config, link: Option<&str>) -> MemoryLocation {
    MemoryLocation::new(settings.share_origin.clone(), link.and_then(query_of))
}

/// Resolve link → last-used → defaults, then apply flag overrides.
///
/// `-p`/`-e` flags are appended as editor rows after the resolved ones, so a
/// blank key is dropped and a repeated key keeps its last value.
pub fn resolve_config(
    config: &Config,
    storage: &dyn PersistencePort,
    location: &dyn ShareLinkPort,
    args: &ConfigArgs,
) -> anyhow::Result<(RunConfig, ConfigSource)> {
    let query = location.query().as_deref().and_then(ShareQuery::parse);
    if args.link.is_some() && query.is_none() {
        warn!("link carries no share parameters; ignoring it");
    }
    let stored = load_last_config(storage);
    let (resolved, source) = resolve_initial(&config.catalog, query.as_ref(), stored.as_ref());
    let mut editable = from_config(&resolved);

    if let Some(skill) = &args.skill {
        if !config.catalog.has_skill(skill) {
            bail!("unknown skill '{skill}' (see `skillplay skills`)");
        }
        editable.skill_id = skill.clone();
    }
    if let Some(model) = &args.model {
        if !config.catalog.has_model(model) {
            bail!("unknown model '{model}' (see `skillplay skills`)");
        }
        editable.model = model.clone();
    }
    for raw in &args.params {
        editable.parameters.push(parse_row(raw)?);
    }
    for raw in &args.env {
        editable.env.push(parse_row(raw)?);
    }

    let run_config = to_config(
        &editable.skill_id,
        &editable.model,
        &editable.parameters,
        &editable.env,
    );
    Ok((run_config, source))
}

/// A copy of `config` safe to print: env values masked.
pub fn masked(config: &RunConfig) -> RunConfig {
    RunConfig {
        env: mask_env(&config.env),
        ..config.clone()
    }
}

pub fn source_label(source: ConfigSource) -> &'static str {
    match source {
        ConfigSource::Link => "link",
        ConfigSource::Stored => "last-used",
        ConfigSource::Defaults => "defaults",
    }
}

/// `k=v, k=v`, or `(none)`. Env values go through [`mask`] first.
pub fn format_map(map: &StringMap, secret: bool) -> String {
    if map.is_empty() {
        return "(none)".to_string();
    }
    map.iter()
        .map(|(k, v)| {
            if secret {
                format!("{k}={}", mask(v))
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_config(config: &RunConfig) {
    println!("skill:      {}", config.skill_id);
    println!("model:      {}", config.model);
    println!("parameters: {}", format_map(&config.parameters, false));
    println!("env:        {}", format_map(&config.env, true));
}
