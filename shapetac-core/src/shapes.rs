//! Shape detection and scoring
//!
//! Scores one player's markers by enumerating the patterns they form:
//! - lines of 3+ markers along the three axes
//! - loops (all six neighbors of some center)
//! - hollow rhombus outlines with sides of 3 and 4 dots
//! - filled triangles with sides of 3 to 8 dots
//! - a variety bonus for mixing pattern families (full mode only)
//!
//! Every detected shape is worth its base points times the product of the
//! bonus multipliers under its cells.

use std::fmt;
use std::ops::RangeInclusive;

use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

use crate::board::{Hex, HexBoard, Player, DIRECTIONS};

// ============================================================================
// SCORING TABLE
// ============================================================================

pub const LOOP_POINTS: u32 = 15;

/// (side length in dots, base points)
pub const HOLLOW_SIZES: [(u8, u32); 2] = [(3, 4), (4, 8)];

pub const TRIANGLE_SIZES: RangeInclusive<u8> = 3..=8;

/// Triangle base points are `size * TRIANGLE_POINTS_PER_SIZE`
pub const TRIANGLE_POINTS_PER_SIZE: u32 = 5;

pub const VARIETY_BONUS: u32 = 30;

/// Shortest run that counts as a line
pub const MIN_LINE: usize = 3;

/// One direction per undirected axis
const LINE_AXES: [Hex; 3] = [DIRECTIONS[0], DIRECTIONS[1], DIRECTIONS[2]];

/// Edge pairs (u, v) that outline a rhombus
const HOLLOW_ORIENTATIONS: [(Hex, Hex); 3] = [
    (DIRECTIONS[0], DIRECTIONS[2]),
    (DIRECTIONS[2], DIRECTIONS[3]),
    (DIRECTIONS[3], DIRECTIONS[4]),
];

// ============================================================================
// TYPES
// ============================================================================

/// Pattern family and size
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Line,
    Loop,
    /// Hollow rhombus outline, side length in dots
    Hollow(u8),
    /// Filled triangle, side length in dots
    Triangle(u8),
    VarietyBonus,
}

impl ShapeKind {
    pub fn is_line(self) -> bool {
        matches!(self, ShapeKind::Line)
    }

    pub fn is_triangle(self) -> bool {
        matches!(self, ShapeKind::Triangle(_))
    }

    /// Loops and hollow outlines both enclose space
    pub fn is_enclosure(self) -> bool {
        matches!(self, ShapeKind::Loop | ShapeKind::Hollow(_))
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Line => f.write_str("line"),
            ShapeKind::Loop => f.write_str("loop"),
            ShapeKind::Hollow(side) => write!(f, "hollow_{}x{}", side, side),
            ShapeKind::Triangle(size) => write!(f, "triangle_{}", size),
            ShapeKind::VarietyBonus => f.write_str("variety_bonus"),
        }
    }
}

impl Serialize for ShapeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A scoring pattern found on the board
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Points after bonus multipliers
    pub points: u32,
    /// Member cells, sorted
    pub cells: Vec<Hex>,
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        ShapeId {
            kind: self.kind,
            cells: self.cells.clone(),
        }
    }
}

/// Identity of a physical pattern: its kind plus its sorted cell set
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub cells: Vec<Hex>,
}

/// How much work a scoring pass does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreMode {
    /// Total plus the shape list, including the variety bonus
    Full,
    /// Total only, no shape list and no variety bonus
    Fast,
}

/// Result of a scoring pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub total: u32,
    /// Empty in fast mode
    pub shapes: Vec<Shape>,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Score every pattern formed by `player`'s markers
pub fn score(board: &HexBoard, player: Player, mode: ScoreMode) -> Score {
    let owned: Vec<Hex> = board.owned_by(player).collect();
    let mut scan = Scan {
        board,
        player,
        mode,
        total: 0,
        shapes: Vec::new(),
    };

    scan.lines(&owned);
    scan.loops(&owned);
    scan.hollows(&owned);
    scan.triangles(&owned);
    if mode == ScoreMode::Full {
        scan.variety_bonus();
    }

    Score {
        total: scan.total,
        shapes: scan.shapes,
    }
}

/// Total points only; the search calls this thousands of times per move
pub fn fast_score(board: &HexBoard, player: Player) -> u32 {
    score(board, player, ScoreMode::Fast).total
}

// ============================================================================
// DETECTION
// ============================================================================

struct Scan<'a> {
    board: &'a HexBoard,
    player: Player,
    mode: ScoreMode,
    total: u32,
    shapes: Vec<Shape>,
}

impl Scan<'_> {
    fn owns(&self, hex: Hex) -> bool {
        self.board.is_owned(hex, self.player)
    }

    fn record(&mut self, kind: ShapeKind, base: u32, mut cells: Vec<Hex>) {
        let multiplier: u32 = cells.iter().map(|&h| self.board.bonus(h)).product();
        let points = base * multiplier;
        self.total += points;

        if self.mode == ScoreMode::Full {
            cells.sort_unstable();
            self.shapes.push(Shape {
                kind,
                points,
                cells,
            });
        }
    }

    /// Maximal runs, each walked once from the cell whose predecessor breaks it
    fn lines(&mut self, owned: &[Hex]) {
        for axis in LINE_AXES {
            for &start in owned {
                if self.owns(start - axis) {
                    continue;
                }

                let mut len = 1;
                while self.owns(start + axis.scale(len)) {
                    len += 1;
                }

                if len as usize >= MIN_LINE {
                    let n = len as u32 - 2;
                    let cells = (0..len).map(|k| start + axis.scale(k)).collect();
                    self.record(ShapeKind::Line, n * (n + 1) / 2, cells);
                }
            }
        }
    }

    /// Each owned cell proposes the six centers it could be ringing
    fn loops(&mut self, owned: &[Hex]) {
        let mut checked: FxHashSet<Hex> = FxHashSet::default();

        for &cell in owned {
            for dir in DIRECTIONS {
                let center = cell - dir;
                if !checked.insert(center) {
                    continue;
                }

                let ring = center.neighbors();
                if ring.iter().all(|&h| self.owns(h)) {
                    self.record(ShapeKind::Loop, LOOP_POINTS, ring.to_vec());
                }
            }
        }
    }

    fn hollows(&mut self, owned: &[Hex]) {
        for (side, base) in HOLLOW_SIZES {
            let steps = side as i32 - 1;
            let mut seen: FxHashSet<Vec<Hex>> = FxHashSet::default();

            for &start in owned {
                for (u, v) in HOLLOW_ORIENTATIONS {
                    if let Some(outline) = self.rhombus_outline(start, u, v, steps) {
                        if seen.insert(outline.clone()) {
                            self.record(ShapeKind::Hollow(side), base, outline);
                        }
                    }
                }
            }
        }
    }

    /// Walk `steps` hops along +u, +v, -u, -v; `None` as soon as a vertex is not owned
    fn rhombus_outline(&self, start: Hex, u: Hex, v: Hex, steps: i32) -> Option<Vec<Hex>> {
        let mut vertices = Vec::with_capacity(4 * steps as usize);
        let mut current = start;

        for leg in [u, v, -u, -v] {
            for _ in 0..steps {
                if !self.owns(current) {
                    return None;
                }
                vertices.push(current);
                current = current + leg;
            }
        }

        vertices.sort_unstable();
        Some(vertices)
    }

    fn triangles(&mut self, owned: &[Hex]) {
        let mut seen: FxHashSet<Vec<Hex>> = FxHashSet::default();

        for size in TRIANGLE_SIZES {
            for &anchor in owned {
                for i in 0..6 {
                    let (u, v) = (DIRECTIONS[i], DIRECTIONS[(i + 1) % 6]);
                    if let Some(cells) = self.filled_triangle(anchor, u, v, size as i32) {
                        if seen.insert(cells.clone()) {
                            let base = size as u32 * TRIANGLE_POINTS_PER_SIZE;
                            self.record(ShapeKind::Triangle(size), base, cells);
                        }
                    }
                }
            }
        }
    }

    /// Cells `anchor + a*u + b*v` for `a + b < size`, all owned
    fn filled_triangle(&self, anchor: Hex, u: Hex, v: Hex, size: i32) -> Option<Vec<Hex>> {
        let far = size - 1;
        if !self.owns(anchor + u.scale(far)) || !self.owns(anchor + v.scale(far)) {
            return None;
        }

        let mut cells = Vec::with_capacity((size * (size + 1) / 2) as usize);
        for a in 0..size {
            for b in 0..size - a {
                let cell = anchor + u.scale(a) + v.scale(b);
                if !self.owns(cell) {
                    return None;
                }
                cells.push(cell);
            }
        }

        cells.sort_unstable();
        Some(cells)
    }

    fn variety_bonus(&mut self) {
        let has = |pred: fn(ShapeKind) -> bool| self.shapes.iter().any(|s| pred(s.kind));

        if has(ShapeKind::is_line) && has(ShapeKind::is_triangle) && has(ShapeKind::is_enclosure) {
            self.total += VARIETY_BONUS;
            self.shapes.push(Shape {
                kind: ShapeKind::VarietyBonus,
                points: VARIETY_BONUS,
                cells: Vec::new(),
            });
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
