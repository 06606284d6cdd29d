//! Agent library: the set of agent ids a match may bind to a seat.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{AgentConfig, ConfigError};

/// Public listing entry for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
}

/// A collection of agent configurations keyed by id.
///
/// Use [`AgentLibrary::scan`] to load from a directory, or
/// [`AgentLibrary::from_configs`] to build one in memory.
#[derive(Debug, Clone, Default)]
pub struct AgentLibrary {
    agents: Vec<AgentConfig>,
}

impl AgentLibrary {
    /// Builds a library from configs already in memory, sorted by id.
    #[instrument(skip(agents), fields(count = agents.len()))]
    pub fn from_configs(mut agents: Vec<AgentConfig>) -> Self {
        agents.sort_by(|a, b| a.id().cmp(b.id()));
        Self { agents }
    }

    /// Scans `dir_path` for `*.toml` files and loads each as an [`AgentConfig`].
    ///
    /// Invalid or non-TOML files are skipped with a warning, as are later
    /// files that reuse an id already loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the path does not exist, is not a directory,
    /// cannot be read, or yields no valid agent configs.
    #[instrument(skip(dir_path), fields(path = %dir_path.as_ref().display()))]
    pub fn scan(dir_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir_path.as_ref();
        info!(path = %path.display(), "Scanning directory for agent configs");

        if !path.is_dir() {
            return Err(ConfigError::new(format!(
                "Agent config directory not found: {}",
                path.display()
            )));
        }

        let entries = std::fs::read_dir(path).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry_result in entries {
            let entry = entry_result
                .map_err(|e| ConfigError::new(format!("Failed to read directory entry: {}", e)))?;
            let entry_path = entry.path();

            if !entry_path.is_file() {
                debug!(path = %entry_path.display(), "Skipping non-file entry");
                continue;
            }
            if entry_path.extension().and_then(|s| s.to_str()) != Some("toml") {
                debug!(path = %entry_path.display(), "Skipping non-TOML file");
                continue;
            }
            files.push(entry_path);
        }
        // Directory order is platform-dependent; first file wins on duplicate ids.
        files.sort();

        let mut agents: Vec<AgentConfig> = Vec::new();
        for file in files {
            match AgentConfig::from_file(&file) {
                Ok(config) if agents.iter().any(|a| a.id() == config.id()) => {
                    warn!(
                        agent_id = %config.id(),
                        path = %file.display(),
                        "Skipping duplicate agent id"
                    );
                }
                Ok(config) => {
                    info!(agent_id = %config.id(), path = %file.display(), "Loaded agent config");
                    agents.push(config);
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping invalid agent config");
                }
            }
        }

        if agents.is_empty() {
            return Err(ConfigError::new(format!(
                "No valid agent configs found in: {}",
                path.display()
            )));
        }

        info!(count = agents.len(), "Agent library loaded");
        Ok(Self::from_configs(agents))
    }

    /// Returns the agent directory to scan when none is given explicitly.
    ///
    /// Resolution order:
    /// 1. `$REVERSI_ARENA_AGENTS`
    /// 2. `$XDG_CONFIG_HOME/reversi_arena/agents`
    /// 3. `./agents`
    #[instrument]
    pub fn default_config_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("REVERSI_ARENA_AGENTS") {
            debug!(path = %dir, "Using REVERSI_ARENA_AGENTS env var");
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            let dir = PathBuf::from(xdg).join("reversi_arena").join("agents");
            debug!(path = %dir.display(), "Using XDG_CONFIG_HOME path");
            return dir;
        }

        debug!("Falling back to ./agents directory");
        PathBuf::from("agents")
    }

    /// All loaded agent configs, sorted by id.
    pub fn agents(&self) -> &[AgentConfig] {
        &self.agents
    }

    /// Looks up an agent config by id.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.id() == id)
    }

    /// Id, name and description of every agent.
    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.agents
            .iter()
            .map(|a| AgentSummary {
                id: a.id().clone(),
                name: a.name().clone(),
                description: a.description().clone(),
            })
            .collect()
    }

    /// Returns the number of loaded agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns `true` if no agents are loaded.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
