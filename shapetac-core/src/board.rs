//! Hex board geometry with cube coordinates

use std::fmt;
use std::ops::{Add, Deref, DerefMut, Neg, Sub};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::PlaceError;

/// Board radius used when a game does not ask for one
pub const DEFAULT_RADIUS: u32 = 4;

/// Number of bonus tiles scattered on a fresh game board
pub const DEFAULT_BONUS_TILES: usize = 5;

/// Multiplier carried by a bonus tile
pub const DEFAULT_BONUS_MULTIPLIER: u32 = 2;

// ============================================================================
// COORDINATES
// ============================================================================

/// Cube hex coordinates, always satisfying `q + r + s == 0`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Hex {
    q: i32,
    r: i32,
    s: i32,
}

/// Unit direction vectors, ordered so that consecutive entries are 60 degrees apart
pub const DIRECTIONS: [Hex; 6] = [
    Hex { q: 1, r: -1, s: 0 },
    Hex { q: 1, r: 0, s: -1 },
    Hex { q: 0, r: 1, s: -1 },
    Hex { q: -1, r: 1, s: 0 },
    Hex { q: -1, r: 0, s: 1 },
    Hex { q: 0, r: -1, s: 1 },
];

impl Hex {
    pub const ORIGIN: Hex = Hex { q: 0, r: 0, s: 0 };

    /// Build from all three components.
    ///
    /// Panics if the components do not sum to zero: a malformed coordinate is a
    /// bug in the caller, never a game condition.
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        assert!(
            q as i64 + r as i64 + s as i64 == 0,
            "cube coordinate ({}, {}, {}) does not sum to zero",
            q,
            r,
            s
        );
        Self { q, r, s }
    }

    /// Build from the two axial components, deriving `s`
    pub const fn axial(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    pub fn q(&self) -> i32 {
        self.q
    }

    pub fn r(&self) -> i32 {
        self.r
    }

    pub fn s(&self) -> i32 {
        self.s
    }

    /// Distance from the origin
    pub fn length(&self) -> i32 {
        cube_length(self.q as i64, self.r as i64, self.s as i64)
    }

    /// Distance between two hexes. Saturates at `i32::MAX` for coordinates far
    /// outside any board.
    pub fn distance_to(&self, other: Hex) -> i32 {
        cube_length(
            self.q as i64 - other.q as i64,
            self.r as i64 - other.r as i64,
            self.s as i64 - other.s as i64,
        )
    }

    /// Neighbor in direction (0-5)
    pub fn neighbor(&self, direction: usize) -> Hex {
        *self + DIRECTIONS[direction % 6]
    }

    /// All six neighbors, on or off any particular board
    pub fn neighbors(&self) -> [Hex; 6] {
        DIRECTIONS.map(|d| *self + d)
    }

    pub fn scale(&self, factor: i32) -> Hex {
        Hex {
            q: self.q * factor,
            r: self.r * factor,
            s: self.s * factor,
        }
    }

    /// Stable string key `"q,r,s"` used by the JSON snapshot
    pub fn key(&self) -> String {
        self.to_string()
    }
}

fn cube_length(q: i64, r: i64, s: i64) -> i32 {
    let length = (q.abs() + r.abs() + s.abs()) / 2;
    i32::try_from(length).unwrap_or(i32::MAX)
}

impl Add for Hex {
    type Output = Hex;

    fn add(self, other: Hex) -> Hex {
        Hex {
            q: self.q + other.q,
            r: self.r + other.r,
            s: self.s + other.s,
        }
    }
}

impl Sub for Hex {
    type Output = Hex;

    fn sub(self, other: Hex) -> Hex {
        Hex {
            q: self.q - other.q,
            r: self.r - other.r,
            s: self.s - other.s,
        }
    }
}

impl Neg for Hex {
    type Output = Hex;

    fn neg(self) -> Hex {
        Hex {
            q: -self.q,
            r: -self.r,
            s: -self.s,
        }
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.q, self.r, self.s)
    }
}

// ============================================================================
// PLAYERS
// ============================================================================

/// Seat tag of a marker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    Red = 0,
    Blue = 1,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::Red, Player::Blue];

    pub fn opponent(self) -> Self {
        match self {
            Player::Red => Player::Blue,
            Player::Blue => Player::Red,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Red => f.write_str("Red"),
            Player::Blue => f.write_str("Blue"),
        }
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Fixed geometry shared by every clone of a board
#[derive(Debug)]
struct Layout {
    radius: i32,
    side: usize,
    /// Dense (q, r) grid -> cell index, `None` off the hexagon
    slots: Vec<Option<usize>>,
    hexes: Vec<Hex>,
}

impl Layout {
    fn generate(radius: i32) -> Self {
        let side = (2 * radius + 1) as usize;
        let mut slots = vec![None; side * side];
        let mut hexes = Vec::new();

        for q in -radius..=radius {
            let r1 = (-radius).max(-q - radius);
            let r2 = radius.min(-q + radius);
            for r in r1..=r2 {
                slots[(q + radius) as usize * side + (r + radius) as usize] = Some(hexes.len());
                hexes.push(Hex::axial(q, r));
            }
        }

        Self {
            radius,
            side,
            slots,
            hexes,
        }
    }
}

/// Hexagonal board of markers plus its bonus tiles.
///
/// Geometry and bonus tiles sit behind `Arc`s, so cloning a board copies only
/// the occupant vector. Search agents rely on that to work on a private copy.
#[derive(Clone, Debug)]
pub struct HexBoard {
    layout: Arc<Layout>,
    occupants: Vec<Option<Player>>,
    bonuses: Arc<FxHashMap<Hex, u32>>,
}

impl HexBoard {
    /// Generate every hex with `max(|q|, |r|, |s|) <= radius`, all empty
    pub fn new(radius: u32) -> Self {
        let layout = Layout::generate(radius as i32);
        let occupants = vec![None; layout.hexes.len()];
        Self {
            layout: Arc::new(layout),
            occupants,
            bonuses: Arc::new(FxHashMap::default()),
        }
    }

    pub fn radius(&self) -> u32 {
        self.layout.radius as u32
    }

    pub fn cell_count(&self) -> usize {
        self.layout.hexes.len()
    }

    pub fn center(&self) -> Hex {
        Hex::ORIGIN
    }

    pub(crate) fn index_of(&self, hex: Hex) -> Option<usize> {
        let radius = self.layout.radius;
        let limit = radius as u32;
        if hex.q.unsigned_abs() > limit
            || hex.r.unsigned_abs() > limit
            || hex.s.unsigned_abs() > limit
        {
            return None;
        }
        let slot = (hex.q + radius) as usize * self.layout.side + (hex.r + radius) as usize;
        self.layout.slots[slot]
    }

    pub(crate) fn hex_at(&self, index: usize) -> Hex {
        self.layout.hexes[index]
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.index_of(hex).is_some()
    }

    /// Occupant of a hex; `None` for empty and off-board hexes alike
    pub fn get(&self, hex: Hex) -> Option<Player> {
        self.index_of(hex).and_then(|i| self.occupants[i])
    }

    pub fn is_owned(&self, hex: Hex, player: Player) -> bool {
        self.get(hex) == Some(player)
    }

    /// Put a marker on an empty on-board hex. Fails without side effects otherwise.
    pub fn place(&mut self, hex: Hex, player: Player) -> Result<(), PlaceError> {
        let index = self.index_of(hex).ok_or(PlaceError::NotOnBoard(hex))?;
        if self.occupants[index].is_some() {
            return Err(PlaceError::CellOccupied(hex));
        }
        self.occupants[index] = Some(player);
        Ok(())
    }

    /// Place a speculative marker that is removed when the guard drops.
    ///
    /// Returns `None` when the hex is off the board or already taken.
    pub fn place_scoped(&mut self, hex: Hex, player: Player) -> Option<Placement<'_>> {
        let index = self.index_of(hex)?;
        if self.occupants[index].is_some() {
            return None;
        }
        self.occupants[index] = Some(player);
        Some(Placement { board: self, index })
    }

    pub fn is_full(&self) -> bool {
        self.occupants.iter().all(Option::is_some)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    /// Every cell in board order
    pub fn cells(&self) -> impl Iterator<Item = (Hex, Option<Player>)> + '_ {
        self.layout
            .hexes
            .iter()
            .zip(self.occupants.iter())
            .map(|(&hex, &occupant)| (hex, occupant))
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Hex, Player)> + '_ {
        self.cells().filter_map(|(hex, occupant)| occupant.map(|p| (hex, p)))
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Hex> + '_ {
        self.cells()
            .filter(|(_, occupant)| occupant.is_none())
            .map(|(hex, _)| hex)
    }

    pub fn owned_by(&self, player: Player) -> impl Iterator<Item = Hex> + '_ {
        self.cells()
            .filter(move |(_, occupant)| *occupant == Some(player))
            .map(|(hex, _)| hex)
    }

    /// On-board neighbors of a hex
    pub fn neighbors(&self, hex: Hex) -> impl Iterator<Item = Hex> + '_ {
        hex.neighbors().into_iter().filter(|n| self.contains(*n))
    }

    // ========================================================================
    // BONUS TILES
    // ========================================================================

    /// Score multiplier of a hex (1 when it is not a bonus tile)
    pub fn bonus(&self, hex: Hex) -> u32 {
        self.bonuses.get(&hex).copied().unwrap_or(1)
    }

    pub fn bonuses(&self) -> impl Iterator<Item = (Hex, u32)> + '_ {
        self.bonuses.iter().map(|(&hex, &mult)| (hex, mult))
    }

    pub fn set_bonus(&mut self, hex: Hex, multiplier: u32) {
        assert!(self.contains(hex), "bonus tile {} is off the board", hex);
        assert!(multiplier > 1, "bonus multiplier must exceed 1");
        Arc::make_mut(&mut self.bonuses).insert(hex, multiplier);
    }

    /// One-time setup: mark `count` random tiles from the outer two rings.
    ///
    /// Falls back to the whole board when the outer rings are too small, and
    /// places nothing when even the whole board is too small.
    pub fn scatter_bonus_tiles<R: Rng>(&mut self, rng: &mut R, count: usize, multiplier: u32) {
        let radius = self.layout.radius;
        let outer: Vec<Hex> = self
            .layout
            .hexes
            .iter()
            .copied()
            .filter(|h| h.length() >= radius - 1)
            .collect();

        let pool = if outer.len() > count {
            outer
        } else if self.cell_count() > count {
            self.layout.hexes.clone()
        } else {
            return;
        };

        for &hex in pool.choose_multiple(rng, count) {
            self.set_bonus(hex, multiplier);
        }
    }

    // ========================================================================
    // ENCODING
    // ========================================================================

    /// Canonical encoding of every occupant, two bits per cell in board order
    pub fn encode(&self) -> BoardKey {
        let mut words = vec![0u64; self.occupants.len().div_ceil(32)];
        for (i, occupant) in self.occupants.iter().enumerate() {
            let bits = match occupant {
                None => 0u64,
                Some(Player::Red) => 1,
                Some(Player::Blue) => 2,
            };
            words[i / 32] |= bits << ((i % 32) * 2);
        }
        BoardKey(words)
    }
}

impl PartialEq for HexBoard {
    fn eq(&self, other: &Self) -> bool {
        self.layout.radius == other.layout.radius
            && self.occupants == other.occupants
            && self.bonuses == other.bonuses
    }
}

impl Eq for HexBoard {}

/// Packed board contents, see [`HexBoard::encode`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoardKey(Vec<u64>);

// ============================================================================
// SCOPED PLACEMENT
// ============================================================================

/// A hypothetical marker that is lifted again when this guard is dropped.
///
/// The guard dereferences to the board, so nested speculation is just another
/// `place_scoped` call on it.
#[derive(Debug)]
pub struct Placement<'a> {
    board: &'a mut HexBoard,
    index: usize,
}

impl Placement<'_> {
    pub fn hex(&self) -> Hex {
        self.board.hex_at(self.index)
    }
}

impl Deref for Placement<'_> {
    type Target = HexBoard;

    fn deref(&self) -> &HexBoard {
        self.board
    }
}

impl DerefMut for Placement<'_> {
    fn deref_mut(&mut self) -> &mut HexBoard {
        self.board
    }
}

impl Drop for Placement<'_> {
    fn drop(&mut self) {
        self.board.occupants[self.index] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_board_generation() {
        assert_eq!(HexBoard::new(0).cell_count(), 1);
        assert_eq!(HexBoard::new(2).cell_count(), 19);
        assert_eq!(HexBoard::new(4).cell_count(), 61);
        assert_eq!(HexBoard::new(6).cell_count(), 127);

        let board = HexBoard::new(4);
        for (hex, occupant) in board.cells() {
            assert_eq!(hex.q() + hex.r() + hex.s(), 0);
            assert!(hex.length() <= 4);
            assert!(occupant.is_none());
        }
    }

    #[test]
    fn test_distance() {
        let a = Hex::new(2, -1, -1);
        let b = Hex::new(-1, 3, -2);
        assert_eq!(a.distance_to(a), 0);
        assert_eq!(a.distance_to(b), b.distance_to(a));
        assert_eq!(a.distance_to(b), 4);
        assert_eq!(Hex::axial(2, 2).length(), 4);
    }

    #[test]
    fn test_extreme_coordinates() {
        let far = Hex::new(i32::MIN, 1 << 30, 1 << 30);
        let board = HexBoard::new(4);

        assert!(!board.contains(far));
        assert_eq!(board.get(far), None);
        assert_eq!(far.length(), i32::MAX);
        assert_eq!(far.distance_to(Hex::ORIGIN), i32::MAX);
        assert_eq!(far.distance_to(far + DIRECTIONS[0]), 1);

        let opposite = Hex::new(i32::MAX, -(1 << 30), -(1 << 30) + 1);
        assert_eq!(far.distance_to(opposite), i32::MAX);
    }

    #[test]
    #[should_panic(expected = "does not sum to zero")]
    fn test_malformed_hex_panics() {
        let _ = Hex::new(1, 1, 1);
    }

    #[test]
    fn test_neighbors() {
        let board = HexBoard::new(1);
        assert_eq!(board.neighbors(Hex::ORIGIN).count(), 6);
        // Corner of a radius-1 board: 3 on-board neighbors
        assert_eq!(board.neighbors(Hex::new(1, -1, 0)).count(), 3);
        for n in Hex::ORIGIN.neighbors() {
            assert_eq!(n.distance_to(Hex::ORIGIN), 1);
        }
    }

    #[test]
    fn test_place_rejections_leave_board_unchanged() {
        let mut board = HexBoard::new(2);
        board.place(Hex::ORIGIN, Player::Red).unwrap();
        let before = board.clone();

        assert_eq!(
            board.place(Hex::ORIGIN, Player::Blue),
            Err(PlaceError::CellOccupied(Hex::ORIGIN))
        );
        let far = Hex::new(3, -3, 0);
        assert_eq!(board.place(far, Player::Blue), Err(PlaceError::NotOnBoard(far)));
        assert_eq!(board, before);
        assert_eq!(board.encode(), before.encode());
    }

    #[test]
    fn test_is_full() {
        let mut board = HexBoard::new(1);
        let hexes: Vec<Hex> = board.cells().map(|(h, _)| h).collect();
        for (i, hex) in hexes.iter().enumerate() {
            assert!(!board.is_full());
            let player = if i % 2 == 0 { Player::Red } else { Player::Blue };
            board.place(*hex, player).unwrap();
        }
        assert!(board.is_full());
    }

    #[test]
    fn test_scoped_placement_is_undone() {
        let mut board = HexBoard::new(2);
        let before = board.clone();
        {
            let mut outer = board.place_scoped(Hex::ORIGIN, Player::Red).unwrap();
            assert_eq!(outer.get(Hex::ORIGIN), Some(Player::Red));
            let inner = outer.place_scoped(Hex::new(1, -1, 0), Player::Blue).unwrap();
            assert_eq!(inner.occupied_count(), 2);
        }
        assert_eq!(board, before);
    }

    #[test]
    fn test_scoped_placement_undone_on_early_return() {
        fn probe(board: &mut HexBoard, bail: Option<usize>) -> Option<usize> {
            let guard = board.place_scoped(Hex::ORIGIN, Player::Red)?;
            let extra = bail?;
            Some(guard.occupied_count() + extra)
        }

        let mut board = HexBoard::new(2);
        assert_eq!(probe(&mut board, None), None);
        assert_eq!(board.occupied_count(), 0);
        assert_eq!(probe(&mut board, Some(1)), Some(2));
        assert_eq!(board.occupied_count(), 0);
        assert!(board.place_scoped(Hex::new(5, -5, 0), Player::Red).is_none());
    }

    #[test]
    fn test_bonus_tiles_in_outer_rings() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut board = HexBoard::new(6);
        board.scatter_bonus_tiles(&mut rng, DEFAULT_BONUS_TILES, DEFAULT_BONUS_MULTIPLIER);

        let bonuses: Vec<_> = board.bonuses().collect();
        assert_eq!(bonuses.len(), 5);
        for (hex, mult) in bonuses {
            assert!(hex.length() >= 5, "bonus at {} is not in the outer rings", hex);
            assert_eq!(mult, 2);
            assert_eq!(board.bonus(hex), 2);
        }
        assert_eq!(board.bonus(Hex::ORIGIN), 1);
    }

    #[test]
    fn test_tiny_board_gets_no_bonus() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut board = HexBoard::new(0);
        board.scatter_bonus_tiles(&mut rng, 5, 2);
        assert_eq!(board.bonuses().count(), 0);
    }

    #[test]
    fn test_clone_shares_bonuses_until_written() {
        let mut board = HexBoard::new(3);
        board.set_bonus(Hex::new(3, -3, 0), 2);
        let mut copy = board.clone();
        copy.set_bonus(Hex::new(-3, 3, 0), 3);
        assert_eq!(board.bonuses().count(), 1);
        assert_eq!(copy.bonuses().count(), 2);
    }

    #[test]
    fn test_encode_distinguishes_owners() {
        let mut red = HexBoard::new(2);
        red.place(Hex::ORIGIN, Player::Red).unwrap();
        let mut blue = HexBoard::new(2);
        blue.place(Hex::ORIGIN, Player::Blue).unwrap();
        assert_ne!(red.encode(), blue.encode());
        assert_ne!(red.encode(), HexBoard::new(2).encode());
    }
}
