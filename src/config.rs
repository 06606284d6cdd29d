//! Service configuration loaded from TOML.

use crate::agent_config::ConfigError;
use crate::reaper::ReaperSettings;
use crate::supervisor::SupervisorSettings;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Settings for the orchestration service. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Idle threshold for the reaper, in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    idle_timeout_secs: u64,

    /// Reaper period, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,

    /// Bound on the agent handshake, in milliseconds.
    #[serde(default = "default_handshake_timeout_ms")]
    handshake_timeout_ms: u64,

    /// Bound on each agent move query, in milliseconds.
    #[serde(default = "default_move_timeout_ms")]
    move_timeout_ms: u64,

    /// Grace period before a stopping agent is killed, in milliseconds.
    #[serde(default = "default_stop_grace_ms")]
    stop_grace_ms: u64,

    /// Directory of agent `.toml` files.
    #[serde(default)]
    agents_dir: Option<PathBuf>,

    /// HTTP bind host.
    #[serde(default = "default_host")]
    host: String,

    /// HTTP bind port.
    #[serde(default = "default_port")]
    port: u16,
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    600
}

fn default_handshake_timeout_ms() -> u64 {
    5_000
}

fn default_move_timeout_ms() -> u64 {
    10_000
}

fn default_stop_grace_ms() -> u64 {
    2_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            move_timeout_ms: default_move_timeout_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            agents_dir: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ArenaConfig {
    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading arena config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(?config, "Arena config loaded");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Overrides the bind host.
    pub fn set_host(&mut self, host: String) {
        self.host = host;
    }

    /// Overrides the bind port.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Overrides the agent directory.
    pub fn set_agents_dir(&mut self, dir: PathBuf) {
        self.agents_dir = Some(dir);
    }

    /// Reaper timing.
    pub fn reaper_settings(&self) -> ReaperSettings {
        ReaperSettings::new(
            Duration::from_secs(self.idle_timeout_secs),
            Duration::from_secs(self.sweep_interval_secs),
        )
    }

    /// Supervisor timeouts.
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings::new(
            Duration::from_millis(self.handshake_timeout_ms),
            Duration::from_millis(self.move_timeout_ms),
            Duration::from_millis(self.stop_grace_ms),
        )
    }
}
