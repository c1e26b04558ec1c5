mod clipboard;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{history::HistorySubcommand, run::RunArgs, share::ShareSubcommand, ConfigArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skillplay",
    about = "Skill execution playground: simulate runs, share configurations, browse history",
    version,
    propagate_version = true
)]
struct Cli {
    /// Playground root (default: auto-detect from .skillplay/, else the home directory)
    #[arg(long, global = true, env = "SKILLPLAY_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .skillplay/ with a default config.yaml
    Init,

    /// Run a skill and stream its transcript (Ctrl-C cancels)
    Run(RunArgs),

    /// List the skills and models in the catalog
    Skills,

    /// Inspect, restore or clear past runs
    History {
        #[command(subcommand)]
        subcommand: HistorySubcommand,
    },

    /// Print a share link for a configuration, or decode one
    Share {
        #[command(subcommand)]
        subcommand: Option<ShareSubcommand>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print a run's result JSON or write it to a file
    Result {
        run_id: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write to .skillplay/exports/ under a generated file name
        #[arg(long, conflicts_with = "out")]
        save: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Skills => cmd::skills::run(&root, cli.json),
        Commands::History { subcommand } => cmd::history::run(&root, subcommand, cli.json),
        Commands::Share { subcommand, config } => {
            cmd::share::run(&root, subcommand, &config, cli.json)
        }
        Commands::Result { run_id, out, save } => {
            cmd::result::run(&root, &run_id, out.as_deref(), save, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
