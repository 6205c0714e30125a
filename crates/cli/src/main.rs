//! Merlin CLI: the main entry point.
//!
//! Commands:
//! - `worker`  : consume queue payloads (one per line on stdin)
//! - `process` : handle a single payload
//! - `config`  : print the default config or validate the current one

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "merlin",
    about = "Merlin: a memory-augmented chat assistant worker",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.merlin/config.toml)
    #[arg(short, long, global = true, env = "MERLIN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume newline-delimited job payloads from stdin
    Worker {
        /// Override worker.concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Process one job payload (base64 or raw JSON); reads stdin if omitted
    Process { payload: Option<String> },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a default config file
    Show,
    /// Load and validate the active config
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Worker { concurrency } => commands::worker::run(config_path, concurrency).await?,
        Commands::Process { payload } => commands::process::run(config_path, payload).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(),
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
        },
    }

    Ok(())
}
