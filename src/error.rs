//! Error taxonomy for match orchestration.

use derive_more::{Display, Error};
use tracing::instrument;

/// The kind of failure, the only thing callers should branch on.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ArenaErrorKind {
    /// No live match has the given id.
    #[display("Match not found: {_0}")]
    NotFound(String),

    /// The requested seat configuration cannot be honored (unknown agent id, two agent seats).
    #[display("Configuration error: {_0}")]
    ConfigurationError(String),

    /// The position is not a legal move for the side to move.
    #[display("Invalid move: {_0}")]
    InvalidMove(String),

    /// An agent move was requested while the agent does not hold the turn.
    #[display("Wrong turn: {_0}")]
    WrongTurn(String),

    /// An agent move was requested for a match without an agent seat.
    #[display("No agent configured for match {_0}")]
    NoAgentConfigured(String),

    /// The agent could not be launched or did not answer `ping` with `pong`.
    #[display("Agent handshake failed: {_0}")]
    HandshakeFailed(String),

    /// The agent answered a move query with something other than a square index.
    #[display("Agent protocol error: {message} (stderr: {stderr})")]
    AgentProtocolError {
        /// What went wrong.
        message: String,
        /// Diagnostic text captured from the agent's stderr.
        stderr: String,
    },

    /// The agent process is no longer running.
    #[display("Agent crashed: {_0}")]
    AgentCrashed(String),

    /// The agent did not answer a query within the configured bound.
    #[display("Agent timed out: {_0}")]
    AgentTimeout(String),

    /// The match is over and accepts no further moves.
    #[display("Match finished: {_0}")]
    MatchFinished(String),
}

impl ArenaErrorKind {
    /// Stable machine-readable code for transports.
    #[instrument(skip(self))]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ConfigurationError(_) => "configuration_error",
            Self::InvalidMove(_) => "invalid_move",
            Self::WrongTurn(_) => "wrong_turn",
            Self::NoAgentConfigured(_) => "no_agent_configured",
            Self::HandshakeFailed(_) => "handshake_failed",
            Self::AgentProtocolError { .. } => "agent_protocol_error",
            Self::AgentCrashed(_) => "agent_crashed",
            Self::AgentTimeout(_) => "agent_timeout",
            Self::MatchFinished(_) => "match_finished",
        }
    }

    /// Whether the failure originated in an agent process rather than the caller.
    pub fn is_agent_failure(&self) -> bool {
        matches!(
            self,
            Self::HandshakeFailed(_)
                | Self::AgentProtocolError { .. }
                | Self::AgentCrashed(_)
                | Self::AgentTimeout(_)
        )
    }
}

/// Orchestration error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct ArenaError {
    /// What failed.
    pub kind: ArenaErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ArenaError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ArenaErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ArenaErrorKind {
        &self.kind
    }
}

impl From<ArenaErrorKind> for ArenaError {
    #[track_caller]
    fn from(kind: ArenaErrorKind) -> Self {
        Self::new(kind)
    }
}
