//! Agent process supervision: spawn, handshake, move queries and teardown.
//!
//! Each agent-controlled seat is backed by one child process speaking a
//! line protocol over stdin/stdout. Every read is bounded by a timeout and
//! every failure is surfaced to the caller; only teardown is best-effort.

use crate::agent_config::AgentConfig;
use crate::board::{BoardEngine, Color, Position};
use crate::error::{ArenaError, ArenaErrorKind};
use derive_getters::Getters;
use derive_new::new;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const PING: &str = "ping";
const PONG: &str = "pong";
const STDERR_MAX_LINES: usize = 200;
const STDERR_SETTLE: Duration = Duration::from_millis(250);

/// Timeouts applied by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct SupervisorSettings {
    /// Bound on the `pong` reply.
    handshake_timeout: Duration,
    /// Bound on each move reply.
    move_timeout: Duration,
    /// How long a stopping agent may take before it is killed.
    stop_grace: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            move_timeout: Duration::from_secs(10),
            stop_grace: Duration::from_secs(2),
        }
    }
}

type StderrBuffer = Arc<Mutex<VecDeque<String>>>;

/// A live agent process bound to one seat.
///
/// Must be released through [`AgentSupervisor::stop`]; `kill_on_drop` is set
/// only as a backstop.
#[derive(Debug)]
pub struct AgentProcess {
    agent_id: String,
    name: String,
    color: Color,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    stderr: StderrBuffer,
    stderr_task: Option<JoinHandle<()>>,
    /// Set while a board has been sent and its reply not yet read.
    awaiting_reply: bool,
}

impl AgentProcess {
    /// Library id of the agent.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Display name of the agent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The seat this agent plays.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether the process has not been stopped yet.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// OS process id while running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Everything the agent wrote to stderr so far (bounded).
    pub fn captured_stderr(&self) -> String {
        let lines = self.stderr.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "agent stdin closed")
        })?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    }

    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        match self.stdout.as_mut() {
            Some(lines) => Ok(lines.next_line().await?.map(|l| l.trim().to_string())),
            None => Ok(None),
        }
    }

    /// Lets the stderr reader catch up after the process has exited.
    async fn settle_stderr(&mut self) {
        if let Some(task) = self.stderr_task.take() {
            let _ = timeout(STDERR_SETTLE, task).await;
        }
    }
}

fn spawn_stderr_reader(
    agent_id: String,
    stderr: tokio::process::ChildStderr,
    buffer: StderrBuffer,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(agent_id = %agent_id, line = %line, "Agent stderr");
            let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer.push_back(line);
            while buffer.len() > STDERR_MAX_LINES {
                buffer.pop_front();
            }
        }
    })
}

/// Owns the spawn, handshake, query and teardown of agent processes.
#[derive(Debug, Clone, Default)]
pub struct AgentSupervisor {
    settings: SupervisorSettings,
}

impl AgentSupervisor {
    /// Creates a supervisor with the given timeouts.
    #[instrument]
    pub fn new(settings: SupervisorSettings) -> Self {
        Self { settings }
    }

    /// The timeouts in effect.
    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Launches the agent with `color` appended to its command and performs the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaErrorKind::HandshakeFailed`] if the process cannot be
    /// launched, exits, or does not answer `ping` with `pong` in time. The
    /// process is stopped before the error is returned.
    #[instrument(skip(self, config), fields(agent_id = %config.id(), color = %color))]
    pub async fn spawn(&self, config: &AgentConfig, color: Color) -> Result<AgentProcess, ArenaError> {
        let (program, args) = config.command().split_first().ok_or_else(|| {
            ArenaError::new(ArenaErrorKind::HandshakeFailed(format!(
                "agent {} has an empty command",
                config.id()
            )))
        })?;

        info!(command = %program, args = ?args, "Starting agent process");

        let mut child = Command::new(program)
            .args(args)
            .arg(color.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(error = %e, "Failed to launch agent");
                ArenaError::new(ArenaErrorKind::HandshakeFailed(format!(
                    "failed to launch {}: {}",
                    config.name(),
                    e
                )))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let buffer: StderrBuffer = Arc::default();
        let stderr_task =
            stderr.map(|s| spawn_stderr_reader(config.id().clone(), s, Arc::clone(&buffer)));

        let mut process = AgentProcess {
            agent_id: config.id().clone(),
            name: config.name().clone(),
            color,
            child: Some(child),
            stdin,
            stdout: stdout.map(|s| BufReader::new(s).lines()),
            stderr: buffer,
            stderr_task,
            awaiting_reply: false,
        };

        match self.handshake(&mut process).await {
            Ok(()) => {
                info!(pid = ?process.pid(), "Agent started successfully");
                Ok(process)
            }
            Err(e) => {
                warn!(error = %e, "Agent handshake failed");
                self.stop(&mut process).await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, process: &mut AgentProcess) -> Result<(), ArenaError> {
        let failed = |message: String| ArenaError::new(ArenaErrorKind::HandshakeFailed(message));

        if let Err(e) = process.send_line(PING).await {
            process.settle_stderr().await;
            return Err(failed(format!(
                "could not send ping: {}; stderr: {}",
                e,
                process.captured_stderr()
            )));
        }

        match timeout(*self.settings.handshake_timeout(), process.read_line()).await {
            Ok(Ok(Some(line))) if line == PONG => Ok(()),
            Ok(Ok(Some(line))) => Err(failed(format!("expected '{PONG}', got '{line}'"))),
            Ok(Ok(None)) => {
                process.settle_stderr().await;
                Err(failed(format!(
                    "agent exited before handshake; stderr: {}",
                    process.captured_stderr()
                )))
            }
            Ok(Err(e)) => Err(failed(format!("read failed: {e}"))),
            Err(_) => Err(failed(format!(
                "no reply within {:?}",
                self.settings.handshake_timeout()
            ))),
        }
    }

    /// Sends the board to the agent and reads its chosen square.
    ///
    /// Never retries. Any failure stops the process, so a late reply can
    /// never be mistaken for the answer to a later query.
    ///
    /// # Errors
    ///
    /// - [`ArenaErrorKind::AgentCrashed`] if the process is stopped or has exited, or
    ///   if an earlier query was cancelled before its reply was read.
    /// - [`ArenaErrorKind::AgentTimeout`] if no reply arrives within the move timeout.
    /// - [`ArenaErrorKind::AgentProtocolError`] for a reply that is not an integer in
    ///   `0..=63`, or no reply because the process closed its output.
    #[instrument(skip(self, process, board), fields(agent_id = %process.agent_id, color = %process.color))]
    pub async fn get_move(
        &self,
        process: &mut AgentProcess,
        board: &dyn BoardEngine,
    ) -> Result<Position, ArenaError> {
        let exit_status = match process.child.as_mut() {
            None => {
                return Err(ArenaErrorKind::AgentCrashed(format!(
                    "agent {} is not running",
                    process.agent_id
                ))
                .into());
            }
            Some(child) => child.try_wait().ok().flatten(),
        };
        if let Some(status) = exit_status {
            warn!(%status, "Agent exited between queries");
            process.settle_stderr().await;
            let stderr = process.captured_stderr();
            self.stop(process).await;
            return Err(ArenaErrorKind::AgentCrashed(format!(
                "agent {} exited with {}; stderr: {}",
                process.agent_id, status, stderr
            ))
            .into());
        }

        // A query abandoned mid-read leaves its reply in the pipe.
        if process.awaiting_reply {
            warn!("Previous query was abandoned; agent output out of sync");
            self.stop(process).await;
            return Err(ArenaErrorKind::AgentCrashed(format!(
                "agent {} was abandoned mid-query and has been stopped",
                process.agent_id
            ))
            .into());
        }

        let line = board.serialize();
        debug!(board = %line, "Sending board to agent");

        process.awaiting_reply = true;
        if let Err(e) = process.send_line(&line).await {
            process.settle_stderr().await;
            let stderr = process.captured_stderr();
            self.stop(process).await;
            return Err(ArenaErrorKind::AgentCrashed(format!(
                "could not write to agent {}: {}; stderr: {}",
                process.agent_id, e, stderr
            ))
            .into());
        }

        let reply = match timeout(*self.settings.move_timeout(), process.read_line()).await {
            Ok(Ok(Some(reply))) => {
                process.awaiting_reply = false;
                reply
            }
            Ok(Ok(None)) => {
                process.settle_stderr().await;
                let stderr = process.captured_stderr();
                self.stop(process).await;
                return Err(ArenaErrorKind::AgentProtocolError {
                    message: format!("agent {} terminated unexpectedly", process.agent_id),
                    stderr,
                }
                .into());
            }
            Ok(Err(e)) => {
                let stderr = process.captured_stderr();
                self.stop(process).await;
                return Err(ArenaErrorKind::AgentProtocolError {
                    message: format!("read from agent {} failed: {}", process.agent_id, e),
                    stderr,
                }
                .into());
            }
            Err(_) => {
                warn!(timeout = ?self.settings.move_timeout(), "Agent move timed out");
                self.stop(process).await;
                return Err(ArenaErrorKind::AgentTimeout(format!(
                    "agent {} gave no move within {:?}",
                    process.agent_id,
                    self.settings.move_timeout()
                ))
                .into());
            }
        };

        match reply.parse::<u8>().ok().and_then(Position::from_index) {
            Some(position) => {
                debug!(index = %reply, %position, "Agent selected move");
                Ok(position)
            }
            None => {
                warn!(reply = %reply, "Agent returned invalid move");
                let stderr = process.captured_stderr();
                self.stop(process).await;
                Err(ArenaErrorKind::AgentProtocolError {
                    message: format!("agent {} returned invalid move: '{}'", process.agent_id, reply),
                    stderr,
                }
                .into())
            }
        }
    }

    /// Stops the process: closes its stdin, waits out the grace period, then kills it.
    ///
    /// Safe to call repeatedly; a stopped process is left alone.
    #[instrument(skip(self, process), fields(agent_id = %process.agent_id, color = %process.color))]
    pub async fn stop(&self, process: &mut AgentProcess) {
        let Some(mut child) = process.child.take() else {
            debug!("Agent already stopped");
            return;
        };

        info!(pid = ?child.id(), "Stopping agent");
        drop(process.stdin.take());

        match timeout(*self.settings.stop_grace(), child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Agent exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for agent"),
            Err(_) => {
                warn!("Force killing agent");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill agent");
                }
            }
        }

        process.stdout = None;
        if let Some(task) = process.stderr_task.take() {
            task.abort();
        }
    }
}
