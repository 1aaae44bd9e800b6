//! Move rejection reasons

use serde::Serialize;

use crate::board::Hex;

/// Why the board refused a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("{0} is not on the board")]
    NotOnBoard(Hex),

    #[error("{0} is already occupied")]
    CellOccupied(Hex),
}

/// Why the game refused a move. Rejections never change the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum MoveError {
    #[error("game over")]
    GameAlreadyOver,

    #[error("coordinate is not on the board")]
    NotOnBoard,

    #[error("cell is already occupied")]
    CellOccupied,

    #[error("first move must be in the center")]
    FirstMoveMustBeCenter,

    #[error("must play within range of existing tiles")]
    AdjacencyViolation,
}

impl From<PlaceError> for MoveError {
    fn from(err: PlaceError) -> Self {
        match err {
            PlaceError::NotOnBoard(_) => MoveError::NotOnBoard,
            PlaceError::CellOccupied(_) => MoveError::CellOccupied,
        }
    }
}

/// An agent name that does not parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent '{0}', expected one of: random, greedy, easy, minimax[:DEPTH[:BEAM]], thoughtful, smart, genius")]
pub struct UnknownAgent(pub String);
