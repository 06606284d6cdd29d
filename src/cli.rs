//! Command-line interface for reversi_arena.

use clap::{Parser, Subcommand};

/// Reversi Arena - match orchestration for humans and agent processes
#[derive(Parser, Debug)]
#[command(name = "reversi_arena")]
#[command(about = "Hosts reversi matches between humans and agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP match server
    Serve {
        /// Path to the arena config file (defaults apply if it doesn't exist)
        #[arg(short, long, default_value = "arena.toml")]
        config: std::path::PathBuf,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory containing agent .toml config files (overrides config)
        #[arg(long)]
        agents_dir: Option<std::path::PathBuf>,
    },

    /// List the agents found in an agent directory
    Agents {
        /// Directory containing agent .toml config files
        #[arg(long)]
        agents_dir: Option<std::path::PathBuf>,
    },
}
