//! Game API endpoints

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shapetac_core::{GameConfig, GameSession, Hex, MinimaxAgent, MoveChooser, Snapshot};

use crate::error::ApiError;
use crate::state::{lock, ServerState, SharedSession};

#[derive(Serialize)]
pub struct CreatedGame {
    pub id: String,
    pub state: Snapshot,
}

/// Create a game. The body is an optional, possibly partial, game config
/// layered over the server defaults.
pub async fn create_game(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedGame>), ApiError> {
    let config = merge_config(state.defaults(), &body)?;
    let (id, snapshot) = state.create_game(config);
    Ok((
        StatusCode::CREATED,
        Json(CreatedGame {
            id,
            state: snapshot,
        }),
    ))
}

fn merge_config(defaults: &GameConfig, body: &[u8]) -> Result<GameConfig, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(defaults.clone());
    }

    let overrides: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    let Value::Object(overrides) = overrides else {
        return Err(ApiError::BadRequest("game config must be a JSON object".to_string()));
    };

    let mut merged = serde_json::to_value(defaults).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(overrides);
    }
    serde_json::from_value(merged)
        .map_err(|e| ApiError::BadRequest(format!("invalid game config: {}", e)))
}

/// Current snapshot of a game
pub async fn get_game(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let session = find(&state, &id)?;
    let snapshot = lock(&session).snapshot();
    Ok(Json(snapshot))
}

/// Drop a game
pub async fn delete_game(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.remove(&id) {
        tracing::info!(game = %id, "game deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::GameNotFound(id))
    }
}

/// Move request; `s` is derived when absent
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub q: i32,
    pub r: i32,
    pub s: Option<i32>,
}

impl MoveRequest {
    fn hex(&self) -> Result<Hex, ApiError> {
        let out_of_range = || {
            ApiError::BadRequest(format!("coordinate ({}, {}) is out of range", self.q, self.r))
        };
        let s = match self.s {
            Some(s) => s,
            None => self
                .q
                .checked_add(self.r)
                .and_then(i32::checked_neg)
                .ok_or_else(out_of_range)?,
        };
        if self.q as i64 + self.r as i64 + s as i64 != 0 {
            return Err(ApiError::BadRequest(format!(
                "coordinate ({}, {}, {}) does not sum to zero",
                self.q, self.r, s
            )));
        }
        Ok(Hex::new(self.q, self.r, s))
    }
}

/// Play a human move
pub async fn make_move(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Snapshot>, ApiError> {
    let hex = req.hex()?;
    let session = find(&state, &id)?;
    let mut game = lock(&session);

    let report = game.apply_move(hex)?;
    tracing::debug!(
        game = %id,
        player = %report.player,
        hex = %hex,
        points = report.points,
        "move"
    );
    Ok(Json(game.snapshot()))
}

/// Let the computer player in the current seat move
pub async fn agent_move(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let session = find(&state, &id)?;

    let snapshot = run_blocking(session, |game| {
        let report = game.play_agent_turn().ok_or(ApiError::NoAgentMove)??;
        tracing::debug!(
            player = %report.player,
            hex = %report.hex,
            points = report.points,
            "agent move"
        );
        Ok(game.snapshot())
    })
    .await?;

    Ok(Json(snapshot))
}

#[derive(Serialize)]
pub struct Suggestion {
    #[serde(rename = "move")]
    pub hex: Option<Hex>,
}

/// A move for the seat to act, without playing it. Human seats get a hint from
/// the smart search.
pub async fn suggest_move(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Suggestion>, ApiError> {
    let session = find(&state, &id)?;

    let hex = run_blocking(session, |game| {
        if game.is_human_turn() {
            Ok(MinimaxAgent::smart().choose_move(game.state()))
        } else {
            Ok(game.request_agent_move())
        }
    })
    .await?;

    Ok(Json(Suggestion { hex }))
}

fn find(state: &ServerState, id: &str) -> Result<SharedSession, ApiError> {
    state
        .session(id)
        .ok_or_else(|| ApiError::GameNotFound(id.to_string()))
}

/// Searches can take a while; keep them off the async workers
async fn run_blocking<T, F>(session: SharedSession, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut GameSession) -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut game = lock(&session);
        work(&mut game)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("search task failed: {}", e)))?
}
