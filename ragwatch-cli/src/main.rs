use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "ragwatch", about = "Health monitoring for RAG pipelines")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file applied on top of the user and project config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate query events into statistics
    Stats(commands::stats::StatsArgs),
    /// Build a baseline from query events
    Baseline(commands::baseline::BaselineArgs),
    /// Check query events for drift against a baseline
    Drift(commands::drift::DriftArgs),
    /// Rank known fixes for an error
    Suggest(commands::suggest::SuggestArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Baseline(args) => {
            commands::baseline::run(args, &ConfigLoader::load(explicit)?).await
        }
        Commands::Drift(args) => commands::drift::run(args, &ConfigLoader::load(explicit)?).await,
        Commands::Suggest(args) => {
            commands::suggest::run(args, &ConfigLoader::load(explicit)?).await
        }
        Commands::Config(args) => commands::config::run(args, explicit),
    }
}
