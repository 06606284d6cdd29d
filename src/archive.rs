//! Archival hand-off for finished matches.

use crate::board::Winner;
use crate::game::{MatchId, MatchOutcome, Seat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::{info, instrument};

/// Everything the archive learns about one finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct MatchRecord {
    /// The match.
    pub id: MatchId,
    /// When the match was created.
    pub created_at: DateTime<Utc>,
    /// When the finishing move was applied.
    pub finished_at: DateTime<Utc>,
    /// Black's seat.
    pub black: Seat,
    /// White's seat.
    pub white: Seat,
    /// Result.
    pub winner: Winner,
    /// Final black disc count.
    pub black_score: u32,
    /// Final white disc count.
    pub white_score: u32,
    /// Discs placed over the match.
    pub total_moves: u32,
}

impl MatchRecord {
    /// Builds the record from a match's seats and outcome.
    pub fn from_outcome(
        id: MatchId,
        created_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        black: Seat,
        white: Seat,
        outcome: MatchOutcome,
    ) -> Self {
        Self::new(
            id,
            created_at,
            finished_at,
            black,
            white,
            outcome.winner,
            outcome.black_score,
            outcome.white_score,
            outcome.ply_count,
        )
    }
}

/// Archive error.
#[derive(Debug, Clone, Display, Error)]
#[display("Archive error: {} at {}:{}", message, file, line)]
pub struct ArchiveError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ArchiveError {
    /// Creates a new archive error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Receiver of finished-match records. Called once per finished match.
#[async_trait]
pub trait Archive: Send + Sync + std::fmt::Debug {
    /// Stores one record.
    async fn record(&self, record: MatchRecord) -> Result<(), ArchiveError>;
}

/// Writes each record as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingArchive;

#[async_trait]
impl Archive for TracingArchive {
    #[instrument(skip(self, record), fields(match_id = %record.id))]
    async fn record(&self, record: MatchRecord) -> Result<(), ArchiveError> {
        info!(
            winner = %record.winner,
            black_score = record.black_score,
            white_score = record.white_score,
            total_moves = record.total_moves,
            black = ?record.black,
            white = ?record.white,
            duration_secs = (record.finished_at - record.created_at).num_seconds(),
            "Archived finished match"
        );
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all records received so far.
    pub fn records(&self) -> Vec<MatchRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    async fn record(&self, record: MatchRecord) -> Result<(), ArchiveError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}
