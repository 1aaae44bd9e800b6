//! Game state, move legality and turn flow

use std::cmp::Ordering;
use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub use crate::board::Player;
use crate::board::{Hex, HexBoard};
use crate::error::MoveError;
use crate::shapes::{score, ScoreMode, Shape, ShapeId};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Rounds per player before a round-limited game ends
pub const DEFAULT_MAX_ROUNDS: u32 = 25;

/// A move must land within this distance of an existing marker
pub const PLACEMENT_RANGE: i32 = 2;

/// Log lines kept in memory
const LOG_CAPACITY: usize = 50;

// ============================================================================
// CORE TYPES
// ============================================================================

/// When a game stops
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EndCondition {
    /// Stop after `max_rounds` moves per player, or earlier when an odd board
    /// would leave one player a move short
    RoundLimit { max_rounds: u32 },
    /// Stop once a player reaches `target`; the second player always gets to
    /// answer a first-player finish with one last move
    ScoreThreshold { target: Option<u32> },
}

impl Default for EndCondition {
    fn default() -> Self {
        EndCondition::RoundLimit {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Game result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    RedWins,
    BlueWins,
    Draw,
}

impl GameResult {
    /// "Red", "Blue" or "Draw" once the game is decided
    pub fn label(self) -> Option<&'static str> {
        match self {
            GameResult::Ongoing => None,
            GameResult::RedWins => Some("Red"),
            GameResult::BlueWins => Some("Blue"),
            GameResult::Draw => Some("Draw"),
        }
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            GameResult::RedWins => Some(Player::Red),
            GameResult::BlueWins => Some(Player::Blue),
            GameResult::Ongoing | GameResult::Draw => None,
        }
    }
}

/// What an accepted move did
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub player: Player,
    pub hex: Hex,
    /// Sum of the points of `new_shapes`. A grown line counts in full here,
    /// while the running score only gains the difference.
    pub points: u32,
    /// Shapes that did not exist before this move
    pub new_shapes: Vec<Shape>,
    /// Shapes absorbed into bigger ones by this move (a line that grew)
    pub vacated_shapes: Vec<ShapeId>,
    pub game_over: bool,
}

// ============================================================================
// MOVE GENERATION
// ============================================================================

/// Empty cells a marker may go on.
///
/// The opening move must take the center. Otherwise an empty board allows any
/// cell, and a non-empty board allows any empty cell within
/// [`PLACEMENT_RANGE`] of a marker. Output is in board order.
pub fn legal_moves(board: &HexBoard, opening: bool) -> Vec<Hex> {
    if opening {
        let center = board.center();
        if board.contains(center) && board.get(center).is_none() {
            return vec![center];
        }
    }

    if board.occupied_count() == 0 {
        return board.empty_cells().collect();
    }

    let mut reachable = vec![false; board.cell_count()];
    for (hex, _) in board.occupied() {
        for near in hex.neighbors() {
            if let Some(i) = board.index_of(near) {
                reachable[i] = true;
            }
            for far in near.neighbors() {
                if let Some(i) = board.index_of(far) {
                    reachable[i] = true;
                }
            }
        }
    }

    reachable
        .iter()
        .enumerate()
        .filter(|(_, &ok)| ok)
        .map(|(i, _)| board.hex_at(i))
        .filter(|&hex| board.get(hex).is_none())
        .collect()
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Complete state of one game. Only [`GameState::apply_move`] changes it.
#[derive(Clone, Debug)]
pub struct GameState {
    board: HexBoard,
    turn_order: [Player; 2],
    end_condition: EndCondition,

    /// Indexed by `Player::index`
    scores: [u32; 2],
    known_shapes: [FxHashSet<ShapeId>; 2],

    /// Index of the turn being played; frozen once the game is over
    turn_index: u32,
    moves_played: u32,
    result: GameResult,
    /// The second player's answer to a first-player threshold finish
    final_move_pending: bool,

    log: VecDeque<String>,
    last_scoring_event: Vec<Shape>,
    last_turn_points: [u32; 2],
    last_turn_shapes: [Vec<Shape>; 2],
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Start a game on `board`; `turn_order[0]` moves first
    pub fn new(board: HexBoard, turn_order: [Player; 2], end_condition: EndCondition) -> Self {
        assert!(
            turn_order[0] != turn_order[1],
            "turn order must contain both players"
        );
        Self {
            board,
            turn_order,
            end_condition,
            scores: [0; 2],
            known_shapes: [FxHashSet::default(), FxHashSet::default()],
            turn_index: 0,
            moves_played: 0,
            result: GameResult::Ongoing,
            final_move_pending: false,
            log: VecDeque::new(),
            last_scoring_event: Vec::new(),
            last_turn_points: [0; 2],
            last_turn_shapes: [Vec::new(), Vec::new()],
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &HexBoard {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.turn_order[(self.turn_index % 2) as usize]
    }

    pub fn turn_order(&self) -> [Player; 2] {
        self.turn_order
    }

    pub fn end_condition(&self) -> EndCondition {
        self.end_condition
    }

    pub fn score(&self, player: Player) -> u32 {
        self.scores[player.index()]
    }

    pub fn turn_index(&self) -> u32 {
        self.turn_index
    }

    pub fn moves_played(&self) -> u32 {
        self.moves_played
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn is_over(&self) -> bool {
        self.result != GameResult::Ongoing
    }

    /// Shapes recorded for a player after its last scoring pass
    pub fn known_shapes(&self, player: Player) -> &FxHashSet<ShapeId> {
        &self.known_shapes[player.index()]
    }

    /// Most recent `count` log lines, oldest first
    pub fn recent_log(&self, count: usize) -> Vec<String> {
        let skip = self.log.len().saturating_sub(count);
        self.log.iter().skip(skip).cloned().collect()
    }

    /// Shapes completed by the most recent move
    pub fn last_scoring_event(&self) -> &[Shape] {
        &self.last_scoring_event
    }

    pub fn last_turn_points(&self, player: Player) -> u32 {
        self.last_turn_points[player.index()]
    }

    pub fn last_turn_shapes(&self, player: Player) -> &[Shape] {
        &self.last_turn_shapes[player.index()]
    }

    /// Legal moves for the player to act; empty once the game is over
    pub fn valid_moves(&self) -> Vec<Hex> {
        if self.is_over() {
            return Vec::new();
        }
        legal_moves(&self.board, self.turn_index == 0)
    }

    // ========================================================================
    // MOVE EXECUTION
    // ========================================================================

    /// Place the current player's marker, score it and advance the turn.
    ///
    /// A rejected move leaves the state exactly as it was.
    pub fn apply_move(&mut self, hex: Hex) -> Result<MoveReport, MoveError> {
        self.check_move(hex)?;

        let player = self.current_player();
        self.board.place(hex, player)?;

        let idx = player.index();
        let scored = score(&self.board, player, ScoreMode::Full);
        let current_ids: FxHashSet<ShapeId> = scored.shapes.iter().map(Shape::id).collect();

        let known = &self.known_shapes[idx];
        let new_shapes: Vec<Shape> = scored
            .shapes
            .into_iter()
            .filter(|shape| !known.contains(&shape.id()))
            .collect();
        let mut vacated_shapes: Vec<ShapeId> = known
            .iter()
            .filter(|id| !current_ids.contains(*id))
            .cloned()
            .collect();
        vacated_shapes.sort();

        // Markers are never removed, so a player's total can only grow
        debug_assert!(scored.total >= self.scores[idx]);
        let points: u32 = new_shapes.iter().map(|shape| shape.points).sum();
        self.scores[idx] = scored.total;
        self.known_shapes[idx] = current_ids;

        self.last_scoring_event = new_shapes.clone();
        self.last_turn_shapes[idx] = new_shapes.clone();
        self.last_turn_points[idx] = points;
        if points > 0 {
            self.push_log(format!("{} scored +{}!", player, points));
        }

        self.moves_played += 1;
        self.check_end_condition(player);
        if !self.is_over() {
            self.turn_index += 1;
        }

        Ok(MoveReport {
            player,
            hex,
            points,
            new_shapes,
            vacated_shapes,
            game_over: self.is_over(),
        })
    }

    fn check_move(&self, hex: Hex) -> Result<(), MoveError> {
        if self.is_over() {
            return Err(MoveError::GameAlreadyOver);
        }
        if self.turn_index == 0 && hex != self.board.center() {
            return Err(MoveError::FirstMoveMustBeCenter);
        }
        if self.board.occupied_count() > 0
            && !self
                .board
                .occupied()
                .any(|(marker, _)| marker.distance_to(hex) <= PLACEMENT_RANGE)
        {
            return Err(MoveError::AdjacencyViolation);
        }
        Ok(())
    }

    // ========================================================================
    // TERMINATION
    // ========================================================================

    fn check_end_condition(&mut self, mover: Player) {
        if self.board.is_full() {
            self.finish();
            return;
        }

        match self.end_condition {
            EndCondition::RoundLimit { max_rounds } => {
                // Round down to even so both players always get the same number of moves
                let capacity = self.board.cell_count() as u32 & !1;
                let limit = max_rounds.saturating_mul(2).min(capacity);
                if self.moves_played >= limit {
                    self.finish();
                }
            }
            EndCondition::ScoreThreshold { target } => {
                if self.final_move_pending {
                    self.finish();
                    return;
                }
                let Some(target) = target else {
                    return;
                };
                if self.scores[mover.index()] < target {
                    return;
                }
                if mover == self.turn_order[1] {
                    self.finish();
                } else {
                    self.final_move_pending = true;
                    self.push_log(format!(
                        "{} reached {}! {} gets one final move.",
                        mover,
                        target,
                        mover.opponent()
                    ));
                }
            }
        }
    }

    fn finish(&mut self) {
        let red = self.scores[Player::Red.index()];
        let blue = self.scores[Player::Blue.index()];
        self.result = match red.cmp(&blue) {
            Ordering::Greater => GameResult::RedWins,
            Ordering::Less => GameResult::BlueWins,
            Ordering::Equal => GameResult::Draw,
        };

        let line = match self.result.winner() {
            Some(player) => format!("Game over! {} wins {}-{}.", player, red, blue),
            None => format!("Game over! Draw at {}-{}.", red, blue),
        };
        self.push_log(line);

        tracing::info!(
            red,
            blue,
            moves = self.moves_played,
            "game finished: {:?}",
            self.result
        );
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn new_game(radius: u32, end_condition: EndCondition) -> GameState {
        GameState::new(
            HexBoard::new(radius),
            [Player::Red, Player::Blue],
            end_condition,
        )
    }

    fn play(state: &mut GameState, moves: &[(i32, i32, i32)]) -> Vec<MoveReport> {
        moves
            .iter()
            .map(|&(q, r, s)| state.apply_move(Hex::new(q, r, s)).unwrap())
            .collect()
    }

    #[test]
    fn test_fresh_game_only_allows_center() {
        let state = new_game(4, EndCondition::default());
        assert_eq!(state.valid_moves(), vec![Hex::ORIGIN]);
        assert_eq!(state.current_player(), Player::Red);
    }

    #[test]
    fn test_first_move_must_be_center() {
        let mut state = new_game(4, EndCondition::default());
        let before = state.board().clone();

        assert_eq!(
            state.apply_move(Hex::new(1, -1, 0)),
            Err(MoveError::FirstMoveMustBeCenter)
        );
        assert_eq!(state.board(), &before);
        assert_eq!(state.turn_index(), 0);

        state.apply_move(Hex::ORIGIN).unwrap();
        assert_eq!(state.current_player(), Player::Blue);

        let moves = state.valid_moves();
        assert_eq!(moves.len(), 18);
        assert!(!moves.contains(&Hex::ORIGIN));
        assert!(moves.iter().all(|m| m.distance_to(Hex::ORIGIN) <= 2));
    }

    #[test]
    fn test_move_rejections_are_side_effect_free() {
        let mut state = new_game(4, EndCondition::default());
        play(&mut state, &[(0, 0, 0)]);
        let board = state.board().clone();
        let turn = state.turn_index();

        assert_eq!(
            state.apply_move(Hex::ORIGIN),
            Err(MoveError::CellOccupied)
        );
        assert_eq!(
            state.apply_move(Hex::new(3, -3, 0)),
            Err(MoveError::AdjacencyViolation)
        );
        assert_eq!(state.board(), &board);
        assert_eq!(state.turn_index(), turn);
        assert_eq!(state.score(Player::Blue), 0);
    }

    #[test]
    fn test_off_board_move_rejected() {
        let mut state = new_game(2, EndCondition::default());
        play(&mut state, &[(0, 0, 0), (2, -2, 0)]);
        assert_eq!(
            state.apply_move(Hex::new(3, -3, 0)),
            Err(MoveError::NotOnBoard)
        );
    }

    #[test]
    fn test_line_scenario() {
        let mut state = new_game(4, EndCondition::default());

        let reports = play(
            &mut state,
            &[
                (0, 0, 0),  // Red
                (0, 2, -2), // Blue
                (1, -1, 0), // Red
                (-2, 2, 0), // Blue
                (2, -2, 0), // Red completes a line of 3
            ],
        );
        let line3 = reports.last().unwrap();
        assert_eq!(line3.points, 1);
        assert_eq!(line3.new_shapes.len(), 1);
        assert_eq!(line3.new_shapes[0].kind.to_string(), "line");
        assert_eq!(line3.new_shapes[0].cells.len(), 3);
        assert_eq!(line3.new_shapes[0].points, 1);
        assert_eq!(state.score(Player::Red), 1);
        let old_id = line3.new_shapes[0].id();

        play(&mut state, &[(-2, 0, 2)]); // Blue
        let line4 = state.apply_move(Hex::new(3, -3, 0)).unwrap();

        // The 3-line is replaced by a 4-line: the turn reports the new line's
        // points, the running score holds the board total
        assert_eq!(line4.new_shapes.len(), 1);
        assert_eq!(line4.new_shapes[0].cells.len(), 4);
        assert_eq!(line4.new_shapes[0].points, 3);
        assert_eq!(line4.vacated_shapes, vec![old_id.clone()]);
        assert_eq!(line4.points, 3);
        assert_eq!(state.score(Player::Red), 3);
        assert_eq!(state.last_turn_points(Player::Red), 3);

        let known = state.known_shapes(Player::Red);
        assert!(!known.contains(&old_id));
        assert!(known.contains(&line4.new_shapes[0].id()));
        assert_eq!(state.recent_log(5), vec!["Red scored +1!", "Red scored +3!"]);
    }

    #[test]
    fn test_turn_points_match_new_shapes() {
        let mut state = new_game(3, EndCondition::RoundLimit { max_rounds: 100 });

        while !state.is_over() {
            let mv = *state
                .valid_moves()
                .iter()
                .min_by_key(|h| (h.length(), **h))
                .unwrap();
            let report = state.apply_move(mv).unwrap();

            let sum: u32 = report.new_shapes.iter().map(|s| s.points).sum();
            assert_eq!(report.points, sum);
            assert_eq!(state.last_turn_points(report.player), sum);
        }
    }

    #[test]
    fn test_far_away_coordinate_rejected() {
        let mut state = new_game(4, EndCondition::default());
        play(&mut state, &[(0, 0, 0)]);

        let far = Hex::new(i32::MIN, 1 << 30, 1 << 30);
        assert_eq!(state.apply_move(far), Err(MoveError::AdjacencyViolation));
        assert_eq!(
            state.apply_move(Hex::new(i32::MAX, i32::MIN, 1)),
            Err(MoveError::AdjacencyViolation)
        );
        assert_eq!(state.moves_played(), 1);
        assert_eq!(state.current_player(), Player::Blue);
    }

    #[test]
    fn test_odd_board_ends_on_equal_turns() {
        // Radius 2 = 19 cells
        let mut state = new_game(2, EndCondition::RoundLimit { max_rounds: 100 });
        let mut placed = [0u32; 2];

        while !state.is_over() {
            let mv = state.valid_moves()[0];
            let report = state.apply_move(mv).unwrap();
            placed[report.player.index()] += 1;
        }

        assert_eq!(state.moves_played(), 18);
        assert_eq!(placed, [9, 9]);
        assert_eq!(state.board().occupied_count(), 18);
        assert!(!state.board().is_full());
    }

    #[test]
    fn test_round_limit() {
        let mut state = new_game(4, EndCondition::RoundLimit { max_rounds: 3 });
        while !state.is_over() {
            let mv = state.valid_moves()[0];
            state.apply_move(mv).unwrap();
        }
        assert_eq!(state.moves_played(), 6);
        assert_eq!(state.valid_moves(), Vec::<Hex>::new());
        assert_eq!(
            state.apply_move(Hex::new(-1, 0, 1)),
            Err(MoveError::GameAlreadyOver)
        );
    }

    #[test]
    fn test_threshold_first_player_grants_final_move() {
        let mut state = new_game(4, EndCondition::ScoreThreshold { target: Some(1) });

        play(
            &mut state,
            &[
                (0, 0, 0),  // Red
                (0, -1, 1), // Blue
                (1, -1, 0), // Red
                (-1, -1, 2), // Blue
                (2, -2, 0), // Red reaches the target
            ],
        );
        assert_eq!(state.score(Player::Red), 1);
        assert!(!state.is_over());
        assert_eq!(state.current_player(), Player::Blue);

        let last = state.apply_move(Hex::new(1, 1, -2)).unwrap();
        assert!(last.game_over);
        assert_eq!(state.result(), GameResult::RedWins);
        assert_eq!(
            state.apply_move(Hex::new(-1, 1, 0)),
            Err(MoveError::GameAlreadyOver)
        );
    }

    #[test]
    fn test_threshold_second_player_ends_immediately() {
        let mut state = GameState::new(
            HexBoard::new(4),
            [Player::Blue, Player::Red],
            EndCondition::ScoreThreshold { target: Some(1) },
        );

        let reports = play(
            &mut state,
            &[
                (0, 0, 0),   // Blue
                (0, 1, -1),  // Red
                (0, -1, 1),  // Blue
                (1, 0, -1),  // Red
                (-1, -1, 2), // Blue
                (2, -1, -1), // Red completes a line as the second player
            ],
        );
        assert!(reports.last().unwrap().game_over);
        assert_eq!(state.result(), GameResult::RedWins);
        assert_eq!(state.moves_played(), 6);
    }

    #[test]
    fn test_threshold_without_target_plays_to_full_board() {
        let mut state = new_game(1, EndCondition::ScoreThreshold { target: None });
        while !state.is_over() {
            let mv = state.valid_moves()[0];
            state.apply_move(mv).unwrap();
        }
        assert!(state.board().is_full());
        assert_eq!(state.moves_played(), 7);
    }

    #[test]
    fn test_scores_never_decrease() {
        let mut state = new_game(3, EndCondition::RoundLimit { max_rounds: 100 });
        let mut last = [0u32; 2];

        while !state.is_over() {
            // Cluster moves near the center so shapes actually form
            let mv = *state
                .valid_moves()
                .iter()
                .min_by_key(|h| (h.length(), **h))
                .unwrap();
            state.apply_move(mv).unwrap();

            for player in Player::ALL {
                assert!(state.score(player) >= last[player.index()]);
                last[player.index()] = state.score(player);
            }
        }

        for player in Player::ALL {
            let full = score(state.board(), player, ScoreMode::Full);
            assert_eq!(state.score(player), full.total);
        }
    }

    #[test]
    fn test_draw_on_equal_scores() {
        let mut state = new_game(4, EndCondition::RoundLimit { max_rounds: 1 });
        play(&mut state, &[(0, 0, 0), (1, -1, 0)]);
        assert_eq!(state.result(), GameResult::Draw);
        assert_eq!(state.result().label(), Some("Draw"));
        assert_eq!(state.turn_index(), 1);
    }

    #[test]
    fn test_legal_moves_on_empty_board_without_opening() {
        let board = HexBoard::new(1);
        assert_eq!(legal_moves(&board, false).len(), 7);
    }
}
