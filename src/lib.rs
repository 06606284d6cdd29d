//! Reversi Arena library - match orchestration for reversi games
//!
//! This library hosts concurrent reversi matches between humans and
//! out-of-process agents.
//!
//! # Architecture
//!
//! - **Board**: Bitboard rules engine behind the [`BoardEngine`] trait
//! - **Match**: Turn state machine with forced passes and termination
//! - **Supervisor**: Agent processes speaking a line protocol over stdio
//! - **Registry**: Concurrent session store with idle eviction
//! - **HTTP**: REST transport over the registry
//!
//! # Example
//!
//! ```no_run
//! use reversi_arena::{AgentLibrary, MatchRegistry, Position, SeatConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = MatchRegistry::new(AgentLibrary::default());
//!
//! let snapshot = registry.create(SeatConfig::humans()).await?;
//! let snapshot = registry
//!     .apply_move(&snapshot.game_id, Position::new(2, 3))
//!     .await?;
//! assert_eq!(snapshot.score.black, 4);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod agent_config;
mod agent_library;
mod archive;
mod board;
mod clock;
mod config;
mod error;
mod game;
mod http;
mod reaper;
mod registry;
mod supervisor;

// Crate-level exports - Agent configuration
pub use agent_config::{AgentConfig, ConfigError};
pub use agent_library::{AgentLibrary, AgentSummary};

// Crate-level exports - Board engine
pub use board::{
    BOARD_SIZE, Bitboard, BoardEngine, BoardLineError, Cell, Color, EngineError, Position, Winner,
};

// Crate-level exports - Match state
pub use game::{Match, MatchId, MatchOutcome, MoveResult, Score, Seat, SeatConfig, Snapshot};

// Crate-level exports - Orchestration
pub use archive::{Archive, ArchiveError, MatchRecord, MemoryArchive, TracingArchive};
pub use clock::{Clock, ManualClock, SystemClock};
pub use reaper::{IdleReaper, ReaperHandle, ReaperSettings};
pub use registry::{EngineFactory, MatchRegistry, RegistryBuilder};
pub use supervisor::{AgentProcess, AgentSupervisor, SupervisorSettings};

// Crate-level exports - Errors and configuration
pub use config::ArenaConfig;
pub use error::{ArenaError, ArenaErrorKind};

// Crate-level exports - Transport
pub use http::{
    AiMoveRequest, AiPlayerSettings, ApiError, CreateGameRequest, ErrorBody, MakeMoveRequest,
    router,
};
