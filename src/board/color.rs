//! Colors, cells and board coordinates.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Width and height of the board.
pub const BOARD_SIZE: u8 = 8;

/// One of the two sides. The only color type used past the engine boundary.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum Color {
    /// Moves first.
    Black,
    /// Moves second.
    White,
}

impl Color {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

/// Contents of a single square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cell {
    /// No disc.
    Empty,
    /// A black disc.
    Black,
    /// A white disc.
    White,
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

/// A square addressed by row and column, both `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row, top to bottom.
    pub row: u8,
    /// Column, left to right.
    pub col: u8,
}

impl Position {
    /// Creates a position without bounds checking; see [`Position::is_on_board`].
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether both coordinates fall inside the board.
    pub fn is_on_board(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// Linear index `row*8+col`, as used on the agent wire.
    #[instrument]
    pub fn to_index(self) -> u8 {
        self.row * BOARD_SIZE + self.col
    }

    /// Creates a position from a linear index, `None` outside `0..64`.
    #[instrument]
    pub fn from_index(index: u8) -> Option<Self> {
        if index >= BOARD_SIZE * BOARD_SIZE {
            return None;
        }
        Some(Self {
            row: index / BOARD_SIZE,
            col: index % BOARD_SIZE,
        })
    }

    /// All 64 squares in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE * BOARD_SIZE).filter_map(Position::from_index)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
