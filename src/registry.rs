//! Session registry: the single source of truth for which matches exist.
//!
//! Structural changes (insert, remove, sweep) take the map lock briefly and
//! never across an await. Each match sits behind its own async mutex, so
//! operations on one match are serialized while unrelated matches proceed.
//! A match removed while callers wait on its mutex is marked closed; those
//! callers then see it as not found.

use crate::agent_library::AgentLibrary;
use crate::archive::{Archive, MatchRecord, TracingArchive};
use crate::board::{Bitboard, BoardEngine, Position};
use crate::clock::{Clock, SystemClock};
use crate::error::{ArenaError, ArenaErrorKind};
use crate::game::{Match, MatchId, MatchOutcome, SeatConfig, Snapshot};
use crate::supervisor::AgentSupervisor;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Produces a fresh board for every new match.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn BoardEngine> + Send + Sync>;

type MatchSlot = Arc<Mutex<Match>>;

struct Inner {
    matches: RwLock<HashMap<MatchId, MatchSlot>>,
    library: AgentLibrary,
    supervisor: AgentSupervisor,
    archive: Arc<dyn Archive>,
    clock: Arc<dyn Clock>,
    engine: EngineFactory,
}

/// Concurrent store of live matches.
///
/// Cheap to clone; clones share the same matches.
#[derive(Clone)]
pub struct MatchRegistry {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchRegistry")
            .field("matches", &self.len())
            .field("agents", &self.inner.library.len())
            .field("supervisor", &self.inner.supervisor)
            .field("archive", &self.inner.archive)
            .field("clock", &self.inner.clock)
            .finish()
    }
}

/// Assembles a [`MatchRegistry`] from its collaborators.
pub struct RegistryBuilder {
    library: AgentLibrary,
    supervisor: AgentSupervisor,
    archive: Arc<dyn Archive>,
    clock: Arc<dyn Clock>,
    engine: EngineFactory,
}

impl RegistryBuilder {
    /// Supervisor used to spawn and query agents.
    pub fn supervisor(mut self, supervisor: AgentSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Receiver of finished-match records.
    pub fn archive(mut self, archive: Arc<dyn Archive>) -> Self {
        self.archive = archive;
        self
    }

    /// Time source for access tracking and archival timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Board constructor for new matches.
    pub fn engine(mut self, engine: EngineFactory) -> Self {
        self.engine = engine;
        self
    }

    /// Builds the registry.
    pub fn build(self) -> MatchRegistry {
        MatchRegistry {
            inner: Arc::new(Inner {
                matches: RwLock::new(HashMap::new()),
                library: self.library,
                supervisor: self.supervisor,
                archive: self.archive,
                clock: self.clock,
                engine: self.engine,
            }),
        }
    }
}

impl MatchRegistry {
    /// Starts a builder with defaults: default supervisor timeouts, log archive,
    /// system clock and the bitboard engine.
    pub fn builder(library: AgentLibrary) -> RegistryBuilder {
        RegistryBuilder {
            library,
            supervisor: AgentSupervisor::default(),
            archive: Arc::new(TracingArchive),
            clock: Arc::new(SystemClock),
            engine: Arc::new(|| Box::new(Bitboard::new()) as Box<dyn BoardEngine>),
        }
    }

    /// Creates a registry with all defaults.
    pub fn new(library: AgentLibrary) -> Self {
        Self::builder(library).build()
    }

    /// The agents matches may bind.
    pub fn library(&self) -> &AgentLibrary {
        &self.inner.library
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<MatchId, MatchSlot>> {
        self.inner
            .matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MatchId, MatchSlot>> {
        self.inner
            .matches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live matches.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no match is live.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Ids of all live matches.
    pub fn ids(&self) -> Vec<MatchId> {
        self.read().keys().cloned().collect()
    }

    /// Creates a match, spawning an agent for the agent seat if there is one.
    ///
    /// The returned snapshot carries the new match id.
    ///
    /// # Errors
    ///
    /// [`ArenaErrorKind::ConfigurationError`] for an unknown agent id or two
    /// agent seats; [`ArenaErrorKind::HandshakeFailed`] if the agent does not
    /// come up.
    #[instrument(skip(self))]
    pub async fn create(&self, seats: SeatConfig) -> Result<Snapshot, ArenaError> {
        let agent = match seats.agent_seats().as_slice() {
            [] => None,
            [(color, agent_id)] => {
                let config = self.inner.library.get(agent_id).ok_or_else(|| {
                    warn!(agent_id, "Unknown agent requested");
                    ArenaError::new(ArenaErrorKind::ConfigurationError(format!(
                        "AI player not found: {agent_id}"
                    )))
                })?;
                Some(self.inner.supervisor.spawn(config, *color).await?)
            }
            _ => {
                warn!("Two agent seats requested");
                return Err(ArenaErrorKind::ConfigurationError(
                    "at most one seat may be agent-controlled".to_string(),
                )
                .into());
            }
        };

        let now = self.now();
        let board = (self.inner.engine)();

        let (id, snapshot) = {
            let mut matches = self.write();
            let id = loop {
                let candidate = Uuid::new_v4().to_string();
                if !matches.contains_key(&candidate) {
                    break candidate;
                }
            };
            let game = Match::new(id.clone(), board, seats, now, agent);
            let snapshot = game.snapshot();
            matches.insert(id.clone(), Arc::new(Mutex::new(game)));
            (id, snapshot)
        };

        info!(match_id = %id, "Created new match");
        Ok(snapshot)
    }

    /// Locks a live match for exclusive use.
    async fn checkout(&self, id: &str) -> Result<OwnedMutexGuard<Match>, ArenaError> {
        let slot = self.read().get(id).cloned();
        let Some(slot) = slot else {
            warn!(match_id = id, "Match not found");
            return Err(ArenaErrorKind::NotFound(id.to_string()).into());
        };

        let game = slot.lock_owned().await;
        if game.is_closed() {
            debug!(match_id = id, "Match removed while waiting");
            return Err(ArenaErrorKind::NotFound(id.to_string()).into());
        }
        Ok(game)
    }

    /// Current state of a match. Counts as an access.
    ///
    /// # Errors
    ///
    /// [`ArenaErrorKind::NotFound`] if no live match has this id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Snapshot, ArenaError> {
        let mut game = self.checkout(id).await?;
        game.touch(self.now());
        Ok(game.snapshot())
    }

    /// Applies a move for the side to move.
    ///
    /// # Errors
    ///
    /// [`ArenaErrorKind::NotFound`], or the state machine's
    /// [`ArenaErrorKind::InvalidMove`] / [`ArenaErrorKind::MatchFinished`].
    #[instrument(skip(self))]
    pub async fn apply_move(&self, id: &str, position: Position) -> Result<Snapshot, ArenaError> {
        let mut game = self.checkout(id).await?;
        self.apply_locked(&mut game, position).await
    }

    async fn apply_locked(&self, game: &mut Match, position: Position) -> Result<Snapshot, ArenaError> {
        let result = game.apply_move(position)?;
        game.touch(self.now());
        if let Some(outcome) = result.finished {
            let record = self.record_for(game, outcome);
            self.archive(record).await;
        }
        Ok(result.snapshot)
    }

    fn record_for(&self, game: &Match, outcome: MatchOutcome) -> MatchRecord {
        MatchRecord::from_outcome(
            game.id().clone(),
            game.created_at(),
            self.now(),
            game.seats().black.clone(),
            game.seats().white.clone(),
            outcome,
        )
    }

    /// Hands the record to the archive on its own task, so the hand-off
    /// completes even if the caller is cancelled. Waits for it otherwise.
    async fn archive(&self, record: MatchRecord) {
        let match_id = record.id.clone();
        let archive = Arc::clone(&self.inner.archive);
        let task = tokio::spawn(async move {
            let match_id = record.id.clone();
            match archive.record(record).await {
                Ok(()) => info!(match_id = %match_id, "Saved finished match"),
                Err(e) => error!(match_id = %match_id, error = %e, "Failed to archive finished match"),
            }
        });
        if let Err(e) = task.await {
            error!(match_id = %match_id, error = %e, "Archive task ended abnormally");
        }
    }

    /// Asks the bound agent for its move and applies it.
    ///
    /// # Errors
    ///
    /// [`ArenaErrorKind::NotFound`], [`ArenaErrorKind::NoAgentConfigured`],
    /// [`ArenaErrorKind::MatchFinished`], [`ArenaErrorKind::WrongTurn`], any
    /// supervisor failure, or [`ArenaErrorKind::InvalidMove`] if the agent
    /// names an illegal square. The board is unchanged on every error.
    #[instrument(skip(self))]
    pub async fn request_agent_move(&self, id: &str) -> Result<Snapshot, ArenaError> {
        let mut game = self.checkout(id).await?;

        if game.agent().is_none() {
            warn!(match_id = id, "No agent configured");
            return Err(ArenaErrorKind::NoAgentConfigured(id.to_string()).into());
        }
        if game.is_finished() {
            return Err(ArenaErrorKind::MatchFinished(id.to_string()).into());
        }

        let side = game.side_to_move();
        let position = {
            let Some((agent, board)) = game.agent_and_board() else {
                return Err(ArenaErrorKind::NoAgentConfigured(id.to_string()).into());
            };
            if agent.color() != side {
                warn!(current = %side, agent_color = %agent.color(), "Not the agent's turn");
                return Err(ArenaErrorKind::WrongTurn(format!(
                    "Not AI's turn. Current player: {side}, AI color: {}",
                    agent.color()
                ))
                .into());
            }
            self.inner.supervisor.get_move(agent, board).await?
        };

        info!(match_id = id, %position, "Agent selected move");
        self.apply_locked(&mut game, position).await
    }

    /// Removes a match and stops its agent.
    ///
    /// Waits for an in-flight operation on the match to finish first.
    ///
    /// # Errors
    ///
    /// [`ArenaErrorKind::NotFound`] if the match is already gone.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ArenaError> {
        let slot = self.write().remove(id);
        let Some(slot) = slot else {
            warn!(match_id = id, "Attempted delete on non-existent match");
            return Err(ArenaErrorKind::NotFound(id.to_string()).into());
        };

        let mut game = slot.lock_owned().await;
        self.teardown(&mut game).await;
        info!(match_id = id, "Deleted match");
        Ok(())
    }

    async fn teardown(&self, game: &mut Match) {
        if let Some(mut agent) = game.close() {
            self.inner.supervisor.stop(&mut agent).await;
        }
    }

    /// Deletes every match idle for longer than `timeout` and returns how many went.
    ///
    /// A match that is busy is in use and therefore not idle. Matches deleted
    /// concurrently by someone else are simply not counted.
    #[instrument(skip(self))]
    pub async fn sweep_idle(&self, timeout: Duration) -> usize {
        let Ok(limit) = chrono::Duration::from_std(timeout) else {
            return 0;
        };
        let now = self.now();

        let expired: Vec<OwnedMutexGuard<Match>> = {
            let mut matches = self.write();
            let stale: Vec<(MatchId, OwnedMutexGuard<Match>)> = matches
                .iter()
                .filter_map(|(id, slot)| {
                    let game = Arc::clone(slot).try_lock_owned().ok()?;
                    (now - game.last_access() > limit).then(|| (id.clone(), game))
                })
                .collect();
            stale
                .into_iter()
                .filter_map(|(id, game)| matches.remove(&id).map(|_| game))
                .collect()
        };

        let count = expired.len();
        for mut game in expired {
            debug!(match_id = %game.id(), "Evicting idle match");
            self.teardown(&mut game).await;
        }

        if count > 0 {
            info!(count, "Garbage collection: deleted idle matches");
        }
        count
    }

    /// Deletes every match and stops every agent. Returns how many matches went.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> usize {
        let slots: Vec<MatchSlot> = self.write().drain().map(|(_, slot)| slot).collect();
        let count = slots.len();
        for slot in slots {
            let mut game = slot.lock_owned().await;
            self.teardown(&mut game).await;
        }
        info!(count, "Registry shut down");
        count
    }
}
