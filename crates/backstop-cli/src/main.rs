mod cmd_config;
mod cmd_hook;
mod cmd_review;
mod cmd_rollback;
mod cmd_scan;
mod cmd_state;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "backstop",
    version,
    about = "Snapshot, review, and roll back coding-agent edits"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one hook event: read the request from stdin, write the response to stdout
    Hook {
        /// Event name (overrides `hook_event_name` in the payload)
        #[arg(long)]
        event: Option<String>,
    },
    /// Scan a file for placeholder/demo/simulated/mock patterns (exit 2 if any)
    Scan {
        /// File path (absolute or project-relative)
        path: String,
    },
    /// Compare two versions of a file and print the review as JSON (exit 2 if degraded)
    Review {
        /// File holding the previous content
        #[arg(long)]
        before: String,
        /// File holding the new content
        #[arg(long)]
        after: String,
        /// Path used to pick the language family (defaults to --after)
        #[arg(long)]
        path: Option<String>,
    },
    /// Inspect and restore snapshots
    Rollback {
        #[command(subcommand)]
        cmd: cmd_rollback::RollbackCmd,
    },
    /// Inspect per-conversation session state
    State {
        #[command(subcommand)]
        cmd: cmd_state::StateCmd,
    },
    /// Read and write data/config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Register backstop hooks in .cursor/hooks.json
    Install,
    /// Remove backstop hooks from .cursor/hooks.json
    Uninstall,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BACKSTOP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let project_root = backstop_store::project_root();

    match cli.cmd {
        Command::Hook { event } => cmd_hook::execute(event.as_deref()),
        Command::Scan { path } => cmd_scan::execute(&project_root, &path),
        Command::Review {
            before,
            after,
            path,
        } => cmd_review::execute(&project_root, &before, &after, path.as_deref()),
        Command::Rollback { cmd } => cmd_rollback::run(cmd, &project_root),
        Command::State { cmd } => cmd_state::run(cmd, &project_root),
        Command::Config { cmd } => cmd_config::run(cmd, &project_root),
        Command::Install => backstop_bridge::install(&project_root),
        Command::Uninstall => backstop_bridge::uninstall(&project_root),
    }
}
