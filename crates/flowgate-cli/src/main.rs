mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::hook::HookKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "flowgate",
    about = "Work-item workflow gates — branch guards, checkpoint gates, and drift diagnostics",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from docs/workflow-state.yaml or .git/)
    #[arg(long, global = true, env = "FLOWGATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect workflow state from on-disk artifacts
    Detect {
        /// Work item id to scope the artifact scan (e.g. 030)
        #[arg(long)]
        workitem: Option<String>,

        /// Cross-check the manifest against actual artifacts
        #[arg(long)]
        verify: bool,

        /// Report detected state for every registered work item
        #[arg(long)]
        all_workitems: bool,
    },

    /// Run a decision hook: JSON event on stdin, decision on stdout
    Hook {
        #[command(subcommand)]
        kind: HookKind,
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
        Commands::Detect {
            workitem,
            verify,
            all_workitems,
        } => cmd::detect::run(&root, workitem.as_deref(), verify, all_workitems, cli.json),
        Commands::Hook { kind } => cmd::hook::run(&root, kind),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
