//! # gf-cli
//!
//! Command-line front end for the goal forest engine.
//!
//! - `gf goal create/update/note/delete`: manage goals
//! - `gf goal attach/detach`: restructure the hierarchy
//! - `gf goal progress/link/unlink`: drive progress directly or via tasks
//! - `gf goal show/tree`: inspect goals
//! - `gf sync <tasks.json>`: reconcile task-linked goals against a task export
//! - `gf summary`: dashboard overview of the whole forest

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::CliPaths;

/// Goal forest CLI: plan goals, break them down, track progress.
#[derive(Parser)]
#[command(name = "gf", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage goals.
    Goal {
        #[command(subcommand)]
        command: commands::goal::GoalCommands,
    },
    /// Reconcile task-linked goals against a JSON task export.
    Sync {
        /// Path to a JSON array of `{"task_id": ..., "completed": ...}` entries.
        tasks: PathBuf,
    },
    /// Show overall progress, upcoming deadlines, and recent achievements.
    Summary {
        /// Maximum entries per list.
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interfere with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gf_goal=info".parse()?)
                .add_directive("gf_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let paths = CliPaths::for_project(&project_root);

    match &cli.command {
        Commands::Goal { command } => commands::goal::execute(command, &paths),
        Commands::Sync { tasks } => commands::sync::execute(tasks, &paths),
        Commands::Summary { limit } => commands::summary::execute(*limit, &paths),
    }
}
