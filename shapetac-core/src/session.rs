//! One game plus the agents seated in it

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::agent::{Agent, AgentKind, MoveChooser};
use crate::board::{Hex, Player};
use crate::config::GameConfig;
use crate::error::MoveError;
use crate::game::{EndCondition, GameState, MoveReport};
use crate::shapes::Shape;

/// Log lines included in a snapshot
pub const SNAPSHOT_LOG_LINES: usize = 5;

/// A game handle: owns the state and the agent for each computer seat
pub struct GameSession {
    config: GameConfig,
    state: GameState,
    agents: [Option<Agent>; 2],
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let config = config.sanitized();
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let state = config.build_state(&mut rng);

        // Each seat gets its own stream so one agent's draws never shift the other's
        let agent_seed =
            |player: Player| config.seed.map(|s| s.wrapping_add(1 + player.index() as u64));
        let agents = Player::ALL.map(|player| {
            config
                .agent(player)
                .map(|kind| Agent::new(kind, agent_seed(player)))
        });

        tracing::info!(
            radius = config.radius,
            first = %state.current_player(),
            red = %controller_name(config.red),
            blue = %controller_name(config.blue),
            "new game"
        );

        Self {
            config,
            state,
            agents,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn apply_move(&mut self, hex: Hex) -> Result<MoveReport, MoveError> {
        self.state.apply_move(hex)
    }

    /// Whether the seat to act is played by a human
    pub fn is_human_turn(&self) -> bool {
        self.agents[self.state.current_player().index()].is_none()
    }

    /// What the agent in the current seat would play, without playing it.
    /// `None` for a human seat or a finished game.
    pub fn request_agent_move(&mut self) -> Option<Hex> {
        if self.state.is_over() {
            return None;
        }
        let seat = self.state.current_player().index();
        self.agents[seat].as_mut()?.choose_move(&self.state)
    }

    /// Let the current seat's agent move. `None` when it has nothing to play.
    pub fn play_agent_turn(&mut self) -> Option<Result<MoveReport, MoveError>> {
        let hex = self.request_agent_move()?;
        Some(self.state.apply_move(hex))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, &self.config)
    }
}

fn controller_name(agent: Option<AgentKind>) -> String {
    agent.map_or_else(|| "human".to_string(), |kind| kind.to_string())
}

/// Serializable view of a game, as served to clients
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    /// "q,r,s" -> occupant
    pub board: BTreeMap<String, Option<Player>>,
    /// "q,r,s" -> multiplier
    pub bonuses: BTreeMap<String, u32>,
    pub scores: BTreeMap<String, u32>,
    pub current_player: Player,
    pub turn_order: [Player; 2],
    pub game_over: bool,
    pub winner: Option<&'static str>,
    pub log: Vec<String>,
    pub last_scoring_event: Vec<Shape>,
    pub last_turn_shapes: BTreeMap<String, Vec<Shape>>,
    pub last_turn_points: BTreeMap<String, u32>,
    pub turn_index: u32,
    pub moves_played: u32,
    pub max_rounds: Option<u32>,
    pub total_turns: Option<u32>,
    pub target_score: Option<u32>,
    /// "human" or the agent name, per seat
    pub controllers: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn capture(state: &GameState, config: &GameConfig) -> Self {
        let board = state.board();

        let (max_rounds, total_turns, target_score) = match state.end_condition() {
            EndCondition::RoundLimit { max_rounds } => {
                let capacity = board.cell_count() as u32 & !1;
                (
                    Some(max_rounds),
                    Some(max_rounds.saturating_mul(2).min(capacity)),
                    None,
                )
            }
            EndCondition::ScoreThreshold { target } => (None, None, target),
        };

        Self {
            board: board.cells().map(|(hex, occupant)| (hex.key(), occupant)).collect(),
            bonuses: board.bonuses().map(|(hex, mult)| (hex.key(), mult)).collect(),
            scores: per_player(|p| state.score(p)),
            current_player: state.current_player(),
            turn_order: state.turn_order(),
            game_over: state.is_over(),
            winner: state.result().label(),
            log: state.recent_log(SNAPSHOT_LOG_LINES),
            last_scoring_event: state.last_scoring_event().to_vec(),
            last_turn_shapes: Player::ALL
                .iter()
                .map(|&p| (p.to_string(), state.last_turn_shapes(p).to_vec()))
                .collect(),
            last_turn_points: per_player(|p| state.last_turn_points(p)),
            turn_index: state.turn_index(),
            moves_played: state.moves_played(),
            max_rounds,
            total_turns,
            target_score,
            controllers: Player::ALL
                .iter()
                .map(|&p| (p.to_string(), controller_name(config.agent(p))))
                .collect(),
        }
    }
}

fn per_player(value: impl Fn(Player) -> u32) -> BTreeMap<String, u32> {
    Player::ALL.iter().map(|&p| (p.to_string(), value(p))).collect()
}
