mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, gate::GateSubcommand, lock::LockSubcommand,
    phase::PhaseSubcommand, sprint::SprintSubcommand, ticket::TicketSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sprint",
    about = "Sprint lifecycle tracker: phases, review gates, the execution lock, and renumbering",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from docs/plans/ or .git/)
    #[arg(long, global = true, env = "SPRINT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, insert, list, inspect, and close sprints
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Inspect and advance a sprint's lifecycle phase
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Record review gate outcomes
    Gate {
        #[command(subcommand)]
        subcommand: GateSubcommand,
    },

    /// Acquire, release, and inspect the execution lock
    Lock {
        #[command(subcommand)]
        subcommand: LockSubcommand,
    },

    /// Manage tickets inside a sprint
    Ticket {
        #[command(subcommand)]
        subcommand: TicketSubcommand,
    },

    /// Compare sprint directories with the state store
    Repair {
        /// Register active sprints the store is missing
        #[arg(long)]
        apply: bool,
    },

    /// Show or validate docs/plans/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
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
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Sprint { subcommand } => cmd::sprint::run(&root, subcommand, cli.json),
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand, cli.json),
        Commands::Gate { subcommand } => cmd::gate::run(&root, subcommand, cli.json),
        Commands::Lock { subcommand } => cmd::lock::run(&root, subcommand, cli.json),
        Commands::Ticket { subcommand } => cmd::ticket::run(&root, subcommand, cli.json),
        Commands::Repair { apply } => cmd::repair::run(&root, apply, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
