//! Reversi Arena - Unified CLI
//!
//! Match server and agent tooling.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use reversi_arena::{AgentLibrary, AgentSupervisor, ArenaConfig, IdleReaper, MatchRegistry};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            agents_dir,
        } => run_server(config, host, port, agents_dir).await,
        Command::Agents { agents_dir } => list_agents(agents_dir),
    }
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reversi_arena=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn resolve_agents_dir(config: &ArenaConfig) -> PathBuf {
    config
        .agents_dir()
        .clone()
        .unwrap_or_else(AgentLibrary::default_config_dir)
}

/// Loads the agent library, falling back to an empty one so the server can
/// still host human matches.
#[instrument(skip(dir), fields(dir = %dir.display()))]
fn load_library(dir: &Path) -> AgentLibrary {
    match AgentLibrary::scan(dir) {
        Ok(library) => {
            info!(count = library.len(), "Agent library loaded");
            library
        }
        Err(e) => {
            warn!(error = %e, "No agents available, serving human matches only");
            AgentLibrary::default()
        }
    }
}

/// Run the HTTP match server
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_server(
    config_path: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    agents_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = ArenaConfig::load_or_default(&config_path)?;
    if let Some(host) = host {
        config.set_host(host);
    }
    if let Some(port) = port {
        config.set_port(port);
    }
    if let Some(dir) = agents_dir {
        config.set_agents_dir(dir);
    }

    let library = load_library(&resolve_agents_dir(&config));
    let registry = MatchRegistry::builder(library)
        .supervisor(AgentSupervisor::new(config.supervisor_settings()))
        .build();
    let reaper = IdleReaper::spawn(registry.clone(), config.reaper_settings());

    let app = reversi_arena::router(registry.clone());
    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(host = %config.host(), port = config.port(), "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    reaper.shutdown().await;
    let closed = registry.shutdown().await;
    info!(closed, "Server stopped");
    Ok(())
}

/// Print the agents found in a directory
fn list_agents(agents_dir: Option<PathBuf>) -> Result<()> {
    let dir = agents_dir.unwrap_or_else(AgentLibrary::default_config_dir);
    let library = AgentLibrary::scan(&dir)?;
    for agent in library.summaries() {
        println!("{}\t{}\t{}", agent.id, agent.name, agent.description);
    }
    Ok(())
}
