use crate::cmd::{
    load_config, masked, open_location, open_storage, resolve_config, source_label, ConfigArgs,
};
use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use skillplay_core::{
    config::Pacing,
    controller::{RunController, RunEvent},
    history::RunStatus,
    run_config::RunConfig,
};
use std::path::Path;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Play the script back without delays
    #[arg(long)]
    pub fast: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    run_id: String,
    status: RunStatus,
    config: RunConfig,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    lines: Vec<String>,
    result: Option<serde_json::Value>,
}

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let settings = load_config(root)?;
    let storage = open_storage(root);
    let location = open_location(&settings, args.config.link.as_deref());
    let (config, source) = resolve_config(&settings, storage.as_ref(), &location, &args.config)?;
    debug!(source = source_label(source), skill = %config.skill_id, "configuration resolved");

    let pacing = if args.fast {
        Pacing::instant()
    } else {
        settings.pacing
    };
    let controller = RunController::new(storage, pacing);

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let report = rt.block_on(drive(&controller, config.clone(), !json))?;

    if json {
        return print_json(&report);
    }
    match report.status {
        RunStatus::Success => {
            if let Some(result) = &report.result {
                println!();
                println!("{}", serde_json::to_string_pretty(result)?);
            }
            eprintln!("run {} finished", report.run_id);
        }
        status => eprintln!("run {} {status}", report.run_id),
    }
    Ok(())
}

/// Start the run, echo its lines as they arrive and cancel on Ctrl-C.
async fn drive(
    controller: &RunController,
    config: RunConfig,
    echo: bool,
) -> anyhow::Result<RunReport> {
    let mut events = BroadcastStream::new(controller.subscribe());
    let ticket = controller
        .start(config.clone())
        .await
        .context("no skill selected")?;
    let run_id = ticket.run_id.clone();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(RunEvent::Line { run_id: id, line })) if id == run_id => {
                    if echo {
                        println!("{line}");
                    }
                }
                Some(Ok(RunEvent::Finished { run_id: id, .. })) if id == run_id => break,
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "transcript output fell behind");
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                controller.cancel().await;
            }
        }
    }

    let outcome = ticket.wait().await;
    let view = controller.snapshot().await;
    let item = controller.history_item(&outcome.run_id).await;
    let result = match view.result.as_deref() {
        Some(text) if outcome.status == RunStatus::Success => {
            Some(serde_json::from_str(text).context("run produced an unreadable result")?)
        }
        _ => None,
    };

    Ok(RunReport {
        run_id: outcome.run_id,
        status: outcome.status,
        config: masked(&config),
        started_at: item.as_ref().map(|i| i.started_at),
        finished_at: item.and_then(|i| i.finished_at),
        lines: view.lines,
        result,
    })
}
