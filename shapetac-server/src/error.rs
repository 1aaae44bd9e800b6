//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shapetac_core::MoveError;

/// Everything a handler can fail with, rendered as `{error, reason}`
#[derive(Debug)]
pub enum ApiError {
    GameNotFound(String),
    Move(MoveError),
    /// The seat to act has no agent, or the game is over
    NoAgentMove,
    BadRequest(String),
    Internal(String),
}

impl From<MoveError> for ApiError {
    fn from(err: MoveError) -> Self {
        ApiError::Move(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, reason) = match self {
            ApiError::GameNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("no game with id '{}'", id),
                json!("GameNotFound"),
            ),
            ApiError::Move(err) => (
                StatusCode::BAD_REQUEST,
                err.to_string(),
                serde_json::to_value(err).unwrap_or_default(),
            ),
            ApiError::NoAgentMove => (
                StatusCode::BAD_REQUEST,
                "no computer player to move".to_string(),
                json!("NoAgentMove"),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message, json!("BadRequest"))
            }
            ApiError::Internal(message) => {
                tracing::error!("internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message, json!("Internal"))
            }
        };

        (status, Json(json!({ "error": error, "reason": reason }))).into_response()
    }
}
