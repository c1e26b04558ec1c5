use crate::clipboard::StdoutClipboard;
use crate::cmd::{
    load_config, masked, open_location, open_storage, print_config, resolve_config, source_label,
    ConfigArgs,
};
use crate::output::print_json;
use clap::Subcommand;
use serde_json::json;
use skillplay_core::{
    export,
    ports::ShareLinkPort,
    resolve::resolve_initial,
    share::{self, ShareQuery},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum ShareSubcommand {
    /// Show the configuration a share link opens with
    Decode { link: String },
}

pub fn run(
    root: &Path,
    subcmd: Option<ShareSubcommand>,
    args: &ConfigArgs,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        Some(ShareSubcommand::Decode { link }) => decode(root, &link, json),
        None => link(root, args, json),
    }
}

fn link(root: &Path, args: &ConfigArgs, json: bool) -> anyhow::Result<()> {
    let settings = load_config(root)?;
    let storage = open_storage(root);
    let location = open_location(&settings, args.link.as_deref());
    let (config, _) = resolve_config(&settings, storage.as_ref(), &location, args)?;

    if json {
        let link = share::share_url(&location.origin(), &config);
        return print_json(&json!({ "link": link }));
    }
    export::copy_share_link(&StdoutClipboard, &location, &config);
    Ok(())
}

fn decode(root: &Path, link: &str, json: bool) -> anyhow::Result<()> {
    let settings = load_config(root)?;
    let query = ShareQuery::from_link(link);
    let (config, source) = resolve_initial(&settings.catalog, query.as_ref(), None);

    // A token that is present but undecodable falls back to an empty set.
    let params_ok = query
        .as_ref()
        .map_or(true, |q| q.params.is_none() || q.decoded_params().is_some());
    let env_ok = query
        .as_ref()
        .map_or(true, |q| q.env.is_none() || q.decoded_env().is_some());

    if json {
        return print_json(&json!({
            "source": source_label(source),
            "config": masked(&config),
            "paramsDecoded": params_ok,
            "envDecoded": env_ok,
        }));
    }

    println!("source:     {}", source_label(source));
    print_config(&config);
    if !params_ok {
        eprintln!("warning: params token could not be decoded; using no parameters");
    }
    if !env_ok {
        eprintln!("warning: env token could not be decoded; using no env");
    }
    Ok(())
}
