//! The capability the match state machine consumes from a rules engine.

use super::{Cell, Color, Position};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Final result of a finished board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Winner {
    /// Black holds more discs.
    Black,
    /// White holds more discs.
    White,
    /// Equal disc counts.
    Draw,
}

impl Winner {
    /// The winning color, `None` on a draw.
    pub fn color(self) -> Option<Color> {
        match self {
            Winner::Black => Some(Color::Black),
            Winner::White => Some(Color::White),
            Winner::Draw => None,
        }
    }
}

/// Rejection raised by an engine when asked to apply an illegal move.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Illegal move {position} for {side}")]
pub struct EngineError {
    /// The rejected square.
    pub position: Position,
    /// The side that tried to move.
    pub side: Color,
}

/// Rules engine for one board.
///
/// Implementations own all rules knowledge: legality, flipping, counting and
/// the agent line encoding. Callers never mutate a board except through
/// [`BoardEngine::apply_move`] and [`BoardEngine::apply_pass`].
pub trait BoardEngine: Send + Sync + std::fmt::Debug {
    /// Whether `position` is a legal move for the side to move.
    fn is_legal_move(&self, position: Position) -> bool;

    /// Places a disc for the side to move and hands the turn over.
    fn apply_move(&mut self, position: Position) -> Result<(), EngineError>;

    /// Hands the turn over without placing a disc.
    fn apply_pass(&mut self);

    /// Legal moves for the side to move, in row-major order.
    fn legal_moves(&self) -> Vec<Position>;

    /// True once neither side has a legal move.
    fn is_game_over(&self) -> bool;

    /// Number of discs of `color` on the board.
    fn piece_count(&self, color: Color) -> u32;

    /// `None` while the game is running.
    fn winner(&self) -> Option<Winner>;

    /// One-line encoding sent to agents.
    fn serialize(&self) -> String;

    /// The side whose turn it is.
    fn side_to_move(&self) -> Color;

    /// Contents of one square.
    fn cell(&self, position: Position) -> Cell;
}
