mod cmd;
mod executor;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{policy::PolicySubcommand, run::RunArgs, tasks::TasksSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gatehouse",
    about = "Policy-driven quality gates: resolve profiles from task tags, run gates with retries, escalate what stays red",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .gatehouse/ or .git/)
    #[arg(long, global = true, env = "GATEHOUSE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter policy to .gatehouse/policy.yaml
    Init,

    /// Run gates for the selected tasks and write artifacts
    Run(RunArgs),

    /// Inspect and validate the gate policy
    Policy {
        #[command(subcommand)]
        subcommand: PolicySubcommand,
    },

    /// Inspect the task list
    Tasks {
        #[command(subcommand)]
        subcommand: TasksSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Run(args) => cmd::run::run(&root, args, cli.json),
        Commands::Policy { subcommand } => cmd::policy::run(&root, subcommand, cli.json),
        Commands::Tasks { subcommand } => cmd::tasks::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
