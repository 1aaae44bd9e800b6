//! Example to run the Shape Tac Toe server standalone
//!
//! Run with: cargo run -p shapetac-server --example run_server

use shapetac_core::{AgentKind, GameConfig, Player};
use shapetac_server::{run_server, ServerConfig, ServerState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig {
        port: 8002,
        static_dir: "static".to_string(),
    };

    // Human plays Red against the smart search unless a request says otherwise
    let defaults = GameConfig::default().with_agent(Player::Blue, Some(AgentKind::Smart));

    println!("Starting Shape Tac Toe server on port {}", config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Open http://localhost:{}/", config.port);

    run_server(config, ServerState::with_defaults(defaults)).await
}
