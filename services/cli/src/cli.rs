use crate::commands::{run_harvest, run_reconcile, run_watch, ReconcileArgs, RunArgs, WatchArgs};
use clap::{Parser, Subcommand};
use procure_harvest::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "procure-harvest",
    about = "Download plan execution reports and purchase documents, then reconcile report statuses",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full harvest against the portal (default command)
    Run(RunArgs),
    /// Sort and annotate a local report with summary statuses, in place
    Reconcile(ReconcileArgs),
    /// Wait for a new file to appear in a directory and print its path
    Watch(WatchArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_harvest(args),
        Command::Reconcile(args) => run_reconcile(args),
        Command::Watch(args) => run_watch(args),
    }
}
