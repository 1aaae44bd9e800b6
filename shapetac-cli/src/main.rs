//! Shape Tac Toe CLI - Command-line interface
//!
//! Commands:
//! - simulate: Play agents against each other and report statistics
//! - serve: Start the web game server

mod server;
mod simulate;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shapetac")]
#[command(about = "Shape Tac Toe: score shapes on a hex board", version)]
struct Cli {
    /// Seed for reproducible games
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play agents against each other and report statistics
    Simulate(simulate::SimulateArgs),
    /// Start the web game server
    Serve(server::ServerArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate::run(args, cli.seed),
        Commands::Serve(args) => server::run(args, cli.seed),
    }
}
