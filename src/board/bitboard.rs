//! 64-bit bitboard reversi engine.

use super::{BOARD_SIZE, BoardEngine, Cell, Color, EngineError, Position, Winner};
use derive_more::{Display, Error};
use tracing::{debug, instrument};

const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Rejection of a malformed board line.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Malformed board line: {message}")]
pub struct BoardLineError {
    /// What was wrong with the line.
    pub message: String,
}

/// Reversi board stored as one bit mask per color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitboard {
    black: u64,
    white: u64,
    side: Color,
}

fn bit(position: Position) -> u64 {
    1u64 << position.to_index()
}

fn step(position: Position, (dr, dc): (i8, i8)) -> Option<Position> {
    let row = position.row as i8 + dr;
    let col = position.col as i8 + dc;
    let size = BOARD_SIZE as i8;
    if (0..size).contains(&row) && (0..size).contains(&col) {
        Some(Position::new(row as u8, col as u8))
    } else {
        None
    }
}

impl Bitboard {
    /// Standard opening position, black to move.
    #[instrument]
    pub fn new() -> Self {
        Self {
            black: bit(Position::new(3, 4)) | bit(Position::new(4, 3)),
            white: bit(Position::new(3, 3)) | bit(Position::new(4, 4)),
            side: Color::Black,
        }
    }

    /// Builds a board from per-color squares. Squares listed for both colors end up black.
    pub fn from_cells(black: &[Position], white: &[Position], side: Color) -> Self {
        let black_mask = black.iter().fold(0u64, |acc, p| acc | bit(*p));
        let white_mask = white.iter().fold(0u64, |acc, p| acc | bit(*p)) & !black_mask;
        Self {
            black: black_mask,
            white: white_mask,
            side,
        }
    }

    /// Parses the agent line format (`X` = side to move, `O` = opponent, `-` = empty).
    #[instrument(skip(line), fields(len = line.len()))]
    pub fn from_line(line: &str, side: Color) -> Result<Self, BoardLineError> {
        let line = line.trim();
        if line.chars().count() != 64 {
            return Err(BoardLineError {
                message: format!("expected 64 squares, got {}", line.chars().count()),
            });
        }

        let mut own = 0u64;
        let mut other = 0u64;
        for (index, ch) in line.chars().enumerate() {
            let mask = 1u64 << index;
            match ch {
                'X' => own |= mask,
                'O' => other |= mask,
                '-' => {}
                _ => {
                    return Err(BoardLineError {
                        message: format!("unexpected character '{ch}' at {index}"),
                    });
                }
            }
        }

        let (black, white) = match side {
            Color::Black => (own, other),
            Color::White => (other, own),
        };
        Ok(Self { black, white, side })
    }

    fn masks(&self, color: Color) -> (u64, u64) {
        match color {
            Color::Black => (self.black, self.white),
            Color::White => (self.white, self.black),
        }
    }

    fn occupied(&self) -> u64 {
        self.black | self.white
    }

    /// Discs that a move at `position` by `color` would flip. Zero means illegal.
    pub fn flips(&self, position: Position, color: Color) -> u64 {
        if !position.is_on_board() || self.occupied() & bit(position) != 0 {
            return 0;
        }
        let (own, other) = self.masks(color);

        let mut flips = 0u64;
        for direction in DIRECTIONS {
            let mut run = 0u64;
            let mut cursor = step(position, direction);
            while let Some(p) = cursor {
                if other & bit(p) == 0 {
                    break;
                }
                run |= bit(p);
                cursor = step(p, direction);
            }
            if let Some(p) = cursor
                && own & bit(p) != 0
            {
                flips |= run;
            }
        }
        flips
    }

    fn has_moves(&self, color: Color) -> bool {
        Position::all().any(|p| self.flips(p, color) != 0)
    }
}

impl Default for Bitboard {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardEngine for Bitboard {
    fn is_legal_move(&self, position: Position) -> bool {
        self.flips(position, self.side) != 0
    }

    fn apply_move(&mut self, position: Position) -> Result<(), EngineError> {
        let flips = self.flips(position, self.side);
        if flips == 0 {
            return Err(EngineError {
                position,
                side: self.side,
            });
        }

        let placed = flips | bit(position);
        match self.side {
            Color::Black => {
                self.black |= placed;
                self.white &= !flips;
            }
            Color::White => {
                self.white |= placed;
                self.black &= !flips;
            }
        }
        debug!(%position, side = %self.side, flipped = flips.count_ones(), "Disc placed");
        self.side = self.side.opponent();
        Ok(())
    }

    fn apply_pass(&mut self) {
        debug!(side = %self.side, "Pass");
        self.side = self.side.opponent();
    }

    fn legal_moves(&self) -> Vec<Position> {
        Position::all()
            .filter(|p| self.flips(*p, self.side) != 0)
            .collect()
    }

    fn is_game_over(&self) -> bool {
        !self.has_moves(Color::Black) && !self.has_moves(Color::White)
    }

    fn piece_count(&self, color: Color) -> u32 {
        self.masks(color).0.count_ones()
    }

    fn winner(&self) -> Option<Winner> {
        if !self.is_game_over() {
            return None;
        }
        let black = self.piece_count(Color::Black);
        let white = self.piece_count(Color::White);
        Some(match black.cmp(&white) {
            std::cmp::Ordering::Greater => Winner::Black,
            std::cmp::Ordering::Less => Winner::White,
            std::cmp::Ordering::Equal => Winner::Draw,
        })
    }

    fn serialize(&self) -> String {
        let (own, other) = self.masks(self.side);
        Position::all()
            .map(|p| {
                if own & bit(p) != 0 {
                    'X'
                } else if other & bit(p) != 0 {
                    'O'
                } else {
                    '-'
                }
            })
            .collect()
    }

    fn side_to_move(&self) -> Color {
        self.side
    }

    fn cell(&self, position: Position) -> Cell {
        if !position.is_on_board() {
            return Cell::Empty;
        }
        if self.black & bit(position) != 0 {
            Cell::Black
        } else if self.white & bit(position) != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stops_at_edges() {
        assert_eq!(step(Position::new(0, 0), (-1, 0)), None);
        assert_eq!(step(Position::new(7, 7), (0, 1)), None);
        assert_eq!(step(Position::new(3, 3), (1, 1)), Some(Position::new(4, 4)));
    }

    #[test]
    fn flips_require_a_closing_disc() {
        // Black at (0,0), white run (0,1)..(0,3), nothing at (0,4): no bracket from (0,5).
        let board = Bitboard::from_cells(
            &[Position::new(0, 0)],
            &[Position::new(0, 1), Position::new(0, 2), Position::new(0, 3)],
            Color::Black,
        );
        assert_eq!(board.flips(Position::new(0, 5), Color::Black), 0);
        assert_eq!(
            board.flips(Position::new(0, 4), Color::Black).count_ones(),
            3
        );
    }

    #[test]
    fn flips_on_occupied_square_is_zero() {
        let board = Bitboard::new();
        assert_eq!(board.flips(Position::new(3, 3), Color::Black), 0);
    }
}
