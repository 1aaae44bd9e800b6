//! Computer opponents
//!
//! Every agent works on a private clone of the live board. Speculative markers
//! go down through [`HexBoard::place_scoped`], so they are lifted again on
//! every exit path and the caller's game is never touched.

use std::fmt;
use std::str::FromStr;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{BoardKey, Hex, HexBoard, Player};
use crate::error::UnknownAgent;
use crate::game::{legal_moves, GameState};
use crate::shapes::fast_score;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_DEPTH: u32 = 2;

/// Candidates kept per interior node after ranking
pub const DEFAULT_BEAM_WIDTH: usize = 6;

/// The root always keeps at least this many candidates
pub const MIN_ROOT_CANDIDATES: usize = 20;

pub const DEFAULT_TABLE_CAPACITY: usize = 200_000;

/// Chance that a thoughtful agent plays greedily instead of searching
const THOUGHTFUL_GREEDY_CHANCE: f64 = 0.5;

// ============================================================================
// AGENT SELECTION
// ============================================================================

/// Strategy names accepted by configs, the CLI and the HTTP API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AgentKind {
    Random,
    Greedy,
    /// Picks one of the two best greedy moves
    Easy,
    Minimax {
        #[serde(default = "default_depth")]
        depth: u32,
        #[serde(default = "default_beam_width")]
        beam_width: usize,
        #[serde(default = "default_memoize")]
        memoize: bool,
    },
    /// Coin flip between greedy and the smart search
    Thoughtful,
    /// Minimax, depth 2, beam 6
    Smart,
    /// Minimax, depth 3, beam 5
    Genius,
}

fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

fn default_beam_width() -> usize {
    DEFAULT_BEAM_WIDTH
}

fn default_memoize() -> bool {
    true
}

impl AgentKind {
    /// Base names, for help text
    pub const NAMES: [&'static str; 7] = [
        "random",
        "greedy",
        "easy",
        "minimax",
        "thoughtful",
        "smart",
        "genius",
    ];
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Random => f.write_str("random"),
            AgentKind::Greedy => f.write_str("greedy"),
            AgentKind::Easy => f.write_str("easy"),
            AgentKind::Minimax {
                depth, beam_width, ..
            } => write!(f, "minimax:{}:{}", depth, beam_width),
            AgentKind::Thoughtful => f.write_str("thoughtful"),
            AgentKind::Smart => f.write_str("smart"),
            AgentKind::Genius => f.write_str("genius"),
        }
    }
}

/// Parses a base name, or `minimax:DEPTH` / `minimax:DEPTH:BEAM`
impl FromStr for AgentKind {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let mut parts = lower.split(':');
        let unknown = || UnknownAgent(s.to_string());

        let kind = match parts.next().unwrap_or_default() {
            "random" => AgentKind::Random,
            "greedy" => AgentKind::Greedy,
            "easy" => AgentKind::Easy,
            "thoughtful" => AgentKind::Thoughtful,
            "smart" => AgentKind::Smart,
            "genius" => AgentKind::Genius,
            "minimax" => {
                let depth = match parts.next() {
                    Some(d) => d.parse().map_err(|_| unknown())?,
                    None => DEFAULT_DEPTH,
                };
                let beam_width = match parts.next() {
                    Some(w) => w.parse().map_err(|_| unknown())?,
                    None => DEFAULT_BEAM_WIDTH,
                };
                if depth == 0 || beam_width == 0 {
                    return Err(unknown());
                }
                AgentKind::Minimax {
                    depth,
                    beam_width,
                    memoize: true,
                }
            }
            _ => return Err(unknown()),
        };

        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(kind)
    }
}

// ============================================================================
// MOVE CHOOSER
// ============================================================================

/// Anything that can pick a move for the player to act
pub trait MoveChooser {
    /// A legal move for `state.current_player()`, or `None` when there is none.
    /// Must leave `state` untouched.
    fn choose_move(&mut self, state: &GameState) -> Option<Hex>;
}

/// One of the built-in agents
pub enum Agent {
    Random(RandomAgent),
    Greedy(GreedyAgent),
    Easy(EasyAgent),
    Minimax(MinimaxAgent),
    Thoughtful(ThoughtfulAgent),
}

impl Agent {
    /// Build an agent; a seed makes every random choice it makes reproducible
    pub fn new(kind: AgentKind, seed: Option<u64>) -> Self {
        match kind {
            AgentKind::Random => Agent::Random(RandomAgent::new(seed)),
            AgentKind::Greedy => Agent::Greedy(GreedyAgent::new(seed)),
            AgentKind::Easy => Agent::Easy(EasyAgent::new(seed)),
            AgentKind::Minimax {
                depth,
                beam_width,
                memoize,
            } => {
                let mut agent = MinimaxAgent::new(depth, beam_width);
                if memoize {
                    agent = agent.with_table(DEFAULT_TABLE_CAPACITY);
                }
                Agent::Minimax(agent)
            }
            AgentKind::Thoughtful => Agent::Thoughtful(ThoughtfulAgent::new(seed)),
            AgentKind::Smart => Agent::Minimax(MinimaxAgent::smart()),
            AgentKind::Genius => Agent::Minimax(MinimaxAgent::genius()),
        }
    }
}

impl MoveChooser for Agent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        match self {
            Agent::Random(agent) => agent.choose_move(state),
            Agent::Greedy(agent) => agent.choose_move(state),
            Agent::Easy(agent) => agent.choose_move(state),
            Agent::Minimax(agent) => agent.choose_move(state),
            Agent::Thoughtful(agent) => agent.choose_move(state),
        }
    }
}

fn rng_from(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

// ============================================================================
// SIMPLE AGENTS
// ============================================================================

/// Uniformly random legal move
pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: rng_from(seed) }
    }
}

impl MoveChooser for RandomAgent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        state.valid_moves().choose(&mut self.rng).copied()
    }
}

/// Move with the highest immediate fast score; ties go to a random candidate
pub struct GreedyAgent {
    rng: ChaCha8Rng,
}

impl GreedyAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: rng_from(seed) }
    }
}

impl MoveChooser for GreedyAgent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        let mut moves = state.valid_moves();
        moves.shuffle(&mut self.rng);

        let me = state.current_player();
        let mut board = state.board().clone();
        let mut best: Option<(u32, Hex)> = None;

        for mv in moves {
            let Some(trial) = board.place_scoped(mv, me) else {
                continue;
            };
            let value = fast_score(&trial, me);
            if best.map_or(true, |(top, _)| value > top) {
                best = Some((value, mv));
            }
        }

        best.map(|(_, mv)| mv)
    }
}

/// One of the two best greedy moves, picked at random
pub struct EasyAgent {
    rng: ChaCha8Rng,
}

impl EasyAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: rng_from(seed) }
    }
}

impl MoveChooser for EasyAgent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        let mut moves = state.valid_moves();
        moves.shuffle(&mut self.rng);

        let mut board = state.board().clone();
        let mut ranked = rank_moves(&mut board, moves, state.current_player());
        ranked.truncate(2);
        ranked.choose(&mut self.rng).map(|&(_, mv)| mv)
    }
}

/// Greedy or smart search, decided by a coin flip every move
pub struct ThoughtfulAgent {
    coin: ChaCha8Rng,
    greedy: GreedyAgent,
    search: MinimaxAgent,
}

impl ThoughtfulAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            coin: rng_from(seed),
            greedy: GreedyAgent::new(seed.map(|s| s.wrapping_add(1))),
            search: MinimaxAgent::smart(),
        }
    }
}

impl MoveChooser for ThoughtfulAgent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        if self.coin.gen_bool(THOUGHTFUL_GREEDY_CHANCE) {
            self.greedy.choose_move(state)
        } else {
            self.search.choose_move(state)
        }
    }
}

// ============================================================================
// MOVE ORDERING
// ============================================================================

/// Fast score of `player` after each move, best first.
///
/// The sort is stable, so equal moves keep their incoming order.
fn rank_moves(board: &mut HexBoard, moves: Vec<Hex>, player: Player) -> Vec<(u32, Hex)> {
    let mut ranked: Vec<(u32, Hex)> = moves
        .into_iter()
        .filter_map(|mv| {
            let trial = board.place_scoped(mv, player)?;
            Some((fast_score(&trial, player), mv))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked
}

/// Leaf value from `me`'s point of view
pub fn evaluate(board: &HexBoard, me: Player) -> i64 {
    fast_score(board, me) as i64 - fast_score(board, me.opponent()) as i64
}

// ============================================================================
// TRANSPOSITION TABLE
// ============================================================================

/// How a stored value relates to the true minimax value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// True value is at least the stored one
    Lower,
    /// True value is at most the stored one
    Upper,
}

#[derive(Clone, Copy, Debug)]
pub struct TableEntry {
    pub value: i64,
    pub bound: Bound,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    board: BoardKey,
    depth: u32,
    to_move: Player,
    maximizing: bool,
}

/// Bounded memo of searched positions. Clears itself when full.
pub struct TranspositionTable {
    entries: FxHashMap<NodeKey, TableEntry>,
    capacity: usize,
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn probe(&self, key: &NodeKey) -> Option<TableEntry> {
        self.entries.get(key).copied()
    }

    pub fn store(&mut self, key: NodeKey, entry: TableEntry) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            tracing::debug!(capacity = self.capacity, "transposition table full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// MINIMAX SEARCH
// ============================================================================

/// Counters for the most recent search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cutoffs: u64,
    pub table_hits: u64,
}

/// Depth-limited minimax with alpha-beta pruning and a ranked beam
pub struct MinimaxAgent {
    depth: u32,
    beam_width: usize,
    table: Option<TranspositionTable>,
    stats: SearchStats,
}

impl MinimaxAgent {
    /// Search without memoization; depth is at least 1
    pub fn new(depth: u32, beam_width: usize) -> Self {
        Self {
            depth: depth.max(1),
            beam_width: beam_width.max(1),
            table: None,
            stats: SearchStats::default(),
        }
    }

    pub fn with_table(mut self, capacity: usize) -> Self {
        self.table = Some(TranspositionTable::new(capacity));
        self
    }

    pub fn smart() -> Self {
        Self::new(2, 6).with_table(DEFAULT_TABLE_CAPACITY)
    }

    pub fn genius() -> Self {
        Self::new(3, 5).with_table(DEFAULT_TABLE_CAPACITY)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn beam_width(&self) -> usize {
        self.beam_width
    }

    pub fn table(&self) -> Option<&TranspositionTable> {
        self.table.as_ref()
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Best move and its minimax value for the player to act.
    ///
    /// Ties go to the earliest candidate in ranked order.
    pub fn search(&mut self, state: &GameState) -> Option<(Hex, i64)> {
        let me = state.current_player();
        let mut board = state.board().clone();
        self.stats = SearchStats::default();

        let mut ranked = rank_moves(&mut board, state.valid_moves(), me);
        ranked.truncate(
            self.beam_width
                .saturating_mul(2)
                .max(MIN_ROOT_CANDIDATES),
        );

        let mut alpha = i64::MIN;
        let mut best: Option<(Hex, i64)> = None;

        for (_, mv) in ranked {
            let value = {
                let Some(mut child) = board.place_scoped(mv, me) else {
                    continue;
                };
                self.minimax(&mut child, self.depth - 1, me.opponent(), alpha, i64::MAX, me)
            };
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((mv, value));
            }
            alpha = alpha.max(value);
        }

        tracing::debug!(
            depth = self.depth,
            beam = self.beam_width,
            nodes = self.stats.nodes,
            cutoffs = self.stats.cutoffs,
            table_hits = self.stats.table_hits,
            value = best.map(|(_, v)| v),
            "minimax search done"
        );
        best
    }

    fn minimax(
        &mut self,
        board: &mut HexBoard,
        depth: u32,
        to_move: Player,
        mut alpha: i64,
        mut beta: i64,
        me: Player,
    ) -> i64 {
        self.stats.nodes += 1;
        let maximizing = to_move == me;
        let (alpha_orig, beta_orig) = (alpha, beta);

        let key = self.table.as_ref().map(|_| NodeKey {
            board: board.encode(),
            depth,
            to_move,
            maximizing,
        });

        if let (Some(table), Some(key)) = (&self.table, &key) {
            if let Some(entry) = table.probe(key) {
                self.stats.table_hits += 1;
                match entry.bound {
                    Bound::Exact => return entry.value,
                    Bound::Lower => alpha = alpha.max(entry.value),
                    Bound::Upper => beta = beta.min(entry.value),
                }
                if alpha >= beta {
                    return entry.value;
                }
            }
        }

        if depth == 0 || board.is_full() {
            let value = evaluate(board, me);
            self.remember(key, value, Bound::Exact);
            return value;
        }

        let moves = legal_moves(board, false);
        let mut ranked = rank_moves(board, moves, to_move);
        ranked.truncate(self.beam_width);
        if ranked.is_empty() {
            let value = evaluate(board, me);
            self.remember(key, value, Bound::Exact);
            return value;
        }

        let mut best = if maximizing { i64::MIN } else { i64::MAX };
        for (_, mv) in ranked {
            let value = {
                let Some(mut child) = board.place_scoped(mv, to_move) else {
                    continue;
                };
                self.minimax(&mut child, depth - 1, to_move.opponent(), alpha, beta, me)
            };

            if maximizing {
                best = best.max(value);
                alpha = alpha.max(value);
            } else {
                best = best.min(value);
                beta = beta.min(value);
            }
            if alpha >= beta {
                self.stats.cutoffs += 1;
                break;
            }
        }

        let bound = if best <= alpha_orig {
            Bound::Upper
        } else if best >= beta_orig {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.remember(key, best, bound);
        best
    }

    fn remember(&mut self, key: Option<NodeKey>, value: i64, bound: Bound) {
        if let (Some(table), Some(key)) = (self.table.as_mut(), key) {
            table.store(key, TableEntry { value, bound });
        }
    }
}

impl MoveChooser for MinimaxAgent {
    fn choose_move(&mut self, state: &GameState) -> Option<Hex> {
        self.search(state).map(|(mv, _)| mv)
    }
}

// ============================================================================
// TESTS
// ============================================================================
