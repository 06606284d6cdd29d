//! Reference agent: plays the move that flips the most discs.
//!
//! Speaks the agent line protocol on stdin/stdout. The seat color is the
//! only argument. Diagnostics go to stderr.

use anyhow::{Context, Result, bail};
use reversi_arena::{Bitboard, BoardEngine, Color, Position};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let color: Color = std::env::args()
        .nth(1)
        .context("usage: greedy_agent <BLACK|WHITE>")?
        .parse()
        .context("seat color must be BLACK or WHITE")?;
    info!(%color, "Greedy agent started");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = if line == "ping" {
            "pong".to_string()
        } else {
            match choose(line, color) {
                Ok(position) => position.to_index().to_string(),
                Err(e) => {
                    warn!(error = %e, "Cannot answer query");
                    "error".to_string()
                }
            }
        };

        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    info!("Input closed, exiting");
    Ok(())
}

fn choose(line: &str, color: Color) -> Result<Position> {
    let board = Bitboard::from_line(line, color)?;
    let best = board
        .legal_moves()
        .into_iter()
        .map(|p| (board.flips(p, color).count_ones(), p))
        .max_by(|(a, pa), (b, pb)| a.cmp(b).then(pb.cmp(pa)));

    match best {
        Some((flips, position)) => {
            debug!(%position, flips, "Chose move");
            Ok(position)
        }
        None => bail!("no legal move for {color}"),
    }
}
