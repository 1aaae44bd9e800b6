//! Server command - start the web game server
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: (delegated to shapetac-server crate)
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use shapetac_core::{AgentKind, GameConfig, Player};
use shapetac_server::{run_server, ServerConfig, ServerState};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8002")]
    pub port: u16,

    /// Directory containing static files for the browser client
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    /// Default game config JSON for new games
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Computer opponent seated as Blue in new games unless a request says otherwise
    #[arg(long)]
    pub opponent: Option<AgentKind>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run server command
///
/// This function reads like a table of contents:
/// 1. Configure server and game defaults
/// 2. Start server (blocking)
pub fn run(args: ServerArgs, seed: Option<u64>) -> Result<()> {
    let config = configure_server(&args)?;
    let defaults = configure_games(&args, seed)?;

    tracing::info!(
        "Starting Shape Tac Toe server on port {}",
        config.port
    );

    start_server(config, ServerState::with_defaults(defaults))
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs) -> Result<ServerConfig> {
    validate_static_dir(&args.static_dir)?;

    Ok(ServerConfig {
        port: args.port,
        static_dir: args.static_dir.to_string_lossy().to_string(),
    })
}

/// Game config that requests start from
fn configure_games(args: &ServerArgs, seed: Option<u64>) -> Result<GameConfig> {
    let mut defaults = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load server game config: {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(opponent) = args.opponent {
        defaults = defaults.with_agent(Player::Blue, Some(opponent));
    }
    if let Some(seed) = seed {
        tracing::warn!("--seed makes every new game identical");
        defaults = defaults.with_seed(seed);
    }
    Ok(defaults)
}

/// Start the server (blocking)
fn start_server(config: ServerConfig, state: ServerState) -> Result<()> {
    // Create tokio runtime for async server
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async { run_server(config, state).await })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
