//! Turn and match state machine.
//!
//! A [`Match`] wraps one exclusively owned board engine plus per-match
//! metadata. Moves enter through [`Match::apply_move`], which validates the
//! move, resolves forced passes and detects termination. The outcome of a
//! finished match is produced exactly once, on the move that ends it.

use crate::board::{BOARD_SIZE, BoardEngine, Cell, Color, Position, Winner};
use crate::error::{ArenaError, ArenaErrorKind};
use crate::supervisor::AgentProcess;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Opaque match identifier.
pub type MatchId = String;

/// Who occupies a seat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "agentId", rename_all = "UPPERCASE")]
pub enum Seat {
    /// A human playing through request/response calls.
    Human,
    /// An agent process, by library id.
    Agent(String),
}

impl Seat {
    /// The agent id, if this seat is agent-controlled.
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Seat::Human => None,
            Seat::Agent(id) => Some(id),
        }
    }
}

/// Seat assignment for both colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatConfig {
    /// Black's seat.
    pub black: Seat,
    /// White's seat.
    pub white: Seat,
}

impl SeatConfig {
    /// Two human seats.
    pub fn humans() -> Self {
        Self {
            black: Seat::Human,
            white: Seat::Human,
        }
    }

    /// An agent on `color`, a human on the other seat.
    pub fn with_agent(color: Color, agent_id: impl Into<String>) -> Self {
        let agent = Seat::Agent(agent_id.into());
        match color {
            Color::Black => Self {
                black: agent,
                white: Seat::Human,
            },
            Color::White => Self {
                black: Seat::Human,
                white: agent,
            },
        }
    }

    /// The seat for `color`.
    pub fn seat(&self, color: Color) -> &Seat {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    /// Every agent-controlled seat, black first.
    pub fn agent_seats(&self) -> Vec<(Color, &str)> {
        [Color::Black, Color::White]
            .into_iter()
            .filter_map(|c| self.seat(c).agent_id().map(|id| (c, id)))
            .collect()
    }
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self::humans()
    }
}

/// Disc counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Black discs.
    pub black: u32,
    /// White discs.
    pub white: u32,
}

/// Point-in-time view of a match, returned from every successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// The match.
    pub game_id: MatchId,
    /// 8×8 grid, row-major.
    pub board: Vec<Vec<Cell>>,
    /// Side to move.
    pub current_player: Color,
    /// Disc counts.
    pub score: Score,
    /// Legal moves for the side to move.
    pub legal_moves: Vec<Position>,
    /// Whether the match has finished.
    pub game_over: bool,
    /// Winning color; absent while running and on a draw.
    pub winner: Option<Color>,
    /// Whether this call forced a pass. Never carried into later snapshots.
    pub passed: bool,
}

/// Result of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Winner or draw.
    pub winner: Winner,
    /// Final black disc count.
    pub black_score: u32,
    /// Final white disc count.
    pub white_score: u32,
    /// Discs placed over the whole match (passes excluded).
    pub ply_count: u32,
}

/// What one applied move produced.
#[derive(Debug, Clone)]
pub struct MoveResult {
    /// The state after the move (and any forced pass).
    pub snapshot: Snapshot,
    /// Set only on the move that ended the match.
    pub finished: Option<MatchOutcome>,
}

/// One game: board, seats, timestamps and the optional agent process.
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    board: Box<dyn BoardEngine>,
    seats: SeatConfig,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    agent: Option<AgentProcess>,
    ply_count: u32,
    outcome: Option<MatchOutcome>,
    closed: bool,
}

impl Match {
    /// Creates a match around a fresh board.
    #[instrument(skip(board, agent), fields(match_id = %id))]
    pub fn new(
        id: MatchId,
        board: Box<dyn BoardEngine>,
        seats: SeatConfig,
        now: DateTime<Utc>,
        agent: Option<AgentProcess>,
    ) -> Self {
        info!(?seats, "Creating match");
        Self {
            id,
            board,
            seats,
            created_at: now,
            last_access: now,
            agent,
            ply_count: 0,
            outcome: None,
            closed: false,
        }
    }

    /// The match id.
    pub fn id(&self) -> &MatchId {
        &self.id
    }

    /// Seat assignment.
    pub fn seats(&self) -> &SeatConfig {
        &self.seats
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last successful read or mutation.
    pub fn last_access(&self) -> DateTime<Utc> {
        self.last_access
    }

    /// Records a successful access.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access = now;
    }

    /// Read-only access to the board.
    pub fn board(&self) -> &dyn BoardEngine {
        self.board.as_ref()
    }

    /// The side to move.
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Discs placed so far.
    pub fn ply_count(&self) -> u32 {
        self.ply_count
    }

    /// The outcome, once finished.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Whether the match has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// The bound agent process, if any.
    pub fn agent(&self) -> Option<&AgentProcess> {
        self.agent.as_ref()
    }

    /// Mutable access to the bound agent process.
    pub fn agent_mut(&mut self) -> Option<&mut AgentProcess> {
        self.agent.as_mut()
    }

    /// Board and agent together, for a move query that reads one and drives the other.
    pub fn agent_and_board(&mut self) -> Option<(&mut AgentProcess, &dyn BoardEngine)> {
        let board = self.board.as_ref();
        self.agent.as_mut().map(|agent| (agent, board))
    }

    /// Marks the match as removed from the registry; later operations see it as gone.
    pub fn close(&mut self) -> Option<AgentProcess> {
        self.closed = true;
        self.agent.take()
    }

    /// Whether the match was removed while a caller waited for it.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Validates and applies a move for the side to move, then resolves passes and termination.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaErrorKind::MatchFinished`] once the match is over and
    /// [`ArenaErrorKind::InvalidMove`] for a position that is not currently
    /// legal. A rejected move leaves the board untouched.
    #[instrument(skip(self), fields(match_id = %self.id, side = %self.board.side_to_move()))]
    pub fn apply_move(&mut self, position: Position) -> Result<MoveResult, ArenaError> {
        if self.is_finished() {
            warn!(%position, "Move attempted on finished match");
            return Err(ArenaErrorKind::MatchFinished(self.id.clone()).into());
        }

        if !position.is_on_board() || !self.board.is_legal_move(position) {
            warn!(%position, "Illegal move attempt");
            return Err(ArenaErrorKind::InvalidMove(format!(
                "row={}, col={} is not legal for {}",
                position.row,
                position.col,
                self.board.side_to_move()
            ))
            .into());
        }

        self.board
            .apply_move(position)
            .map_err(|e| ArenaError::new(ArenaErrorKind::InvalidMove(e.to_string())))?;
        self.ply_count += 1;

        let mut passed = false;
        if self.board.legal_moves().is_empty() && !self.board.is_game_over() {
            info!(side = %self.board.side_to_move(), "Auto-pass: no legal moves");
            self.board.apply_pass();
            passed = true;
            if self.board.legal_moves().is_empty() {
                debug!("Double pass detected");
            }
        }

        let finished = if self.board.is_game_over() {
            let outcome = self.final_outcome();
            info!(
                winner = %outcome.winner,
                black = outcome.black_score,
                white = outcome.white_score,
                plies = outcome.ply_count,
                "Match finished"
            );
            self.outcome = Some(outcome);
            Some(outcome)
        } else {
            None
        };

        info!(
            %position,
            next = %self.board.side_to_move(),
            passed,
            "Move executed"
        );

        Ok(MoveResult {
            snapshot: self.snapshot_with(passed),
            finished,
        })
    }

    fn final_outcome(&self) -> MatchOutcome {
        let black_score = self.board.piece_count(Color::Black);
        let white_score = self.board.piece_count(Color::White);
        let winner = self.board.winner().unwrap_or(match black_score.cmp(&white_score) {
            std::cmp::Ordering::Greater => Winner::Black,
            std::cmp::Ordering::Less => Winner::White,
            std::cmp::Ordering::Equal => Winner::Draw,
        });
        MatchOutcome {
            winner,
            black_score,
            white_score,
            ply_count: self.ply_count,
        }
    }

    /// The current view, with `passed` unset.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_with(false)
    }

    fn snapshot_with(&self, passed: bool) -> Snapshot {
        let board = (0..BOARD_SIZE)
            .map(|row| {
                (0..BOARD_SIZE)
                    .map(|col| self.board.cell(Position::new(row, col)))
                    .collect()
            })
            .collect();

        let game_over = self.board.is_game_over();
        let winner = if game_over {
            self.outcome
                .map(|o| o.winner)
                .or_else(|| self.board.winner())
                .and_then(Winner::color)
        } else {
            None
        };

        Snapshot {
            game_id: self.id.clone(),
            board,
            current_player: self.board.side_to_move(),
            score: Score {
                black: self.board.piece_count(Color::Black),
                white: self.board.piece_count(Color::White),
            },
            legal_moves: self.board.legal_moves(),
            game_over,
            winner,
            passed,
        }
    }
}
