//! Shape Tac Toe Server - HTTP API for the browser client
//!
//! This crate provides the web backend:
//! - REST API for creating, playing and inspecting games
//! - Computer moves and hints, searched off the async workers
//! - Static file serving for the client

mod error;
mod routes;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

pub use error::ApiError;
pub use state::{ServerState, MAX_SESSIONS};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8002,
            static_dir: "static".to_string(),
        }
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Game API
        .route("/api/games", post(routes::games::create_game))
        .route(
            "/api/games/:id",
            get(routes::games::get_game).delete(routes::games::delete_game),
        )
        .route("/api/games/:id/move", post(routes::games::make_move))
        .route("/api/games/:id/ai-move", post(routes::games::agent_move))
        .route("/api/games/:id/suggest", get(routes::games::suggest_move))
        // Shared state
        .with_state(state)
        // Static file serving (must be last)
        .fallback_service(static_service)
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig, state: ServerState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = create_router(&config, Arc::new(state));

    tracing::info!("Shape Tac Toe server starting on http://0.0.0.0:{}", config.port);
    tracing::info!("Static files served from: {}", config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
