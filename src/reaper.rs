//! Background eviction of idle matches.

use crate::registry::MatchRegistry;
use derive_getters::Getters;
use derive_new::new;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// How aggressively idle matches are evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct ReaperSettings {
    /// A match untouched for longer than this is deleted.
    idle_timeout: Duration,
    /// Time between sweeps.
    sweep_interval: Duration,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Periodic task that sweeps the registry.
#[derive(Debug)]
pub struct IdleReaper;

/// Handle to a running reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl IdleReaper {
    /// Starts sweeping `registry` every `sweep_interval`. The first sweep runs one
    /// interval after start.
    #[instrument(skip(registry))]
    pub fn spawn(registry: MatchRegistry, settings: ReaperSettings) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let period = (*settings.sweep_interval()).max(Duration::from_millis(1));
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(?settings, "Started idle reaper");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Idle reaper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let deleted = registry.sweep_idle(*settings.idle_timeout()).await;
                        if deleted > 0 {
                            info!(deleted, "Reaper cleaned up inactive matches");
                        } else {
                            debug!("Reaper found no idle matches");
                        }
                    }
                }
            }
        });

        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

impl ReaperHandle {
    /// Stops the task and waits for it to finish its current sweep.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Idle reaper task ended abnormally");
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
