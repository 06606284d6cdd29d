//! Board engine adapter: the reversi rules the match layer consumes.

mod bitboard;
mod color;
mod engine;

pub use bitboard::{Bitboard, BoardLineError};
pub use color::{BOARD_SIZE, Cell, Color, Position};
pub use engine::{BoardEngine, EngineError, Winner};
