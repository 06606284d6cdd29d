//! Agent configuration: how to launch one kind of agent process.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration for one agent, as loaded from a `.toml` file.
///
/// ```toml
/// id = "greedy"
/// name = "Greedy Player"
/// command = ["greedy_agent"]
/// description = "Takes the move that flips the most discs"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Identifier used when creating matches.
    id: String,

    /// Human-readable name.
    name: String,

    /// Executable followed by its arguments. The seat color is appended at spawn.
    command: Vec<String>,

    /// Short description for agent listings.
    #[serde(default)]
    description: String,
}

impl AgentConfig {
    /// Creates a new agent configuration.
    #[instrument(skip(name, command, description), fields(agent_id = %id))]
    pub fn new(id: String, name: String, command: Vec<String>, description: String) -> Self {
        Self {
            id,
            name,
            command,
            description,
        }
    }

    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading agent config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        if config.command.is_empty() {
            return Err(ConfigError::new(format!(
                "Agent {} has an empty command",
                config.id
            )));
        }

        info!(agent_id = %config.id, name = %config.name, "Agent config loaded");
        Ok(config)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
