//! Shape Tac Toe Core - Game engine and AI
//!
//! This crate provides the core game logic for Shape Tac Toe:
//! - Board geometry (hexagonal board in cube coordinates, bonus tiles)
//! - Shape detection and scoring
//! - Turn flow, move legality and end conditions
//! - Computer opponents from random play to beam-limited minimax
//! - Game configuration and a session handle for front ends

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod session;
pub mod shapes;

// Re-exports for convenient access
pub use agent::{Agent, AgentKind, MinimaxAgent, MoveChooser};
pub use board::{Hex, HexBoard, Placement, Player, DIRECTIONS};
pub use config::GameConfig;
pub use error::{MoveError, PlaceError, UnknownAgent};
pub use game::{legal_moves, EndCondition, GameResult, GameState, MoveReport};
pub use session::{GameSession, Snapshot};
pub use shapes::{fast_score, score, Score, ScoreMode, Shape, ShapeKind};
