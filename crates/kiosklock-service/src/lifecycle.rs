//! Background enforcement task.
//!
//! [`EnforcementLoop`] owns a single tokio task that selects on two
//! intervals: the surface interval drives surface correction and the sweep
//! interval drives the process sweep. Before each pass the persisted kiosk
//! state is read; once it is `Inactive` the task exits on its own, so
//! deactivation takes effect within one interval even if nobody calls
//! [`EnforcementLoop::stop`].
//!
//! Missed ticks are skipped rather than replayed; a sweep that ran late is
//! not followed by a burst of catch-up sweeps.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::enforcement::{EnforcementConfig, Enforcer, SurfaceAction};

struct RunningTask {
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl fmt::Debug for RunningTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningTask")
            .field("finished", &self.handle.is_finished())
            .finish_non_exhaustive()
    }
}

/// Starts, stops and observes the enforcement task.
#[derive(Debug)]
pub struct EnforcementLoop {
    enforcer: Arc<Enforcer>,
    config: EnforcementConfig,
    task: Mutex<Option<RunningTask>>,
}

impl EnforcementLoop {
    /// Creates a stopped loop.
    #[must_use]
    pub fn new(enforcer: Enforcer, config: EnforcementConfig) -> Self {
        Self {
            enforcer: Arc::new(enforcer),
            config,
            task: Mutex::new(None),
        }
    }

    /// Spawns the enforcement task on the current runtime. Returns `false`
    /// if a task is already running.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Enforcement loop already running");
            return false;
        }

        let (shutdown, shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(run(Arc::clone(&self.enforcer), self.config, shutdown_rx));
        *task = Some(RunningTask { shutdown, handle });
        true
    }

    /// Cancels the task and waits for it to exit. Returns `false` if no task
    /// had been started.
    pub async fn stop(&self) -> bool {
        let Some(task) = self.task.lock().await.take() else {
            return false;
        };

        // The receiver is gone if the task already exited.
        let _ = task.shutdown.send(()).await;
        if let Err(e) = task.handle.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Enforcement task ended abnormally");
            }
        }
        true
    }

    /// Whether the task is alive.
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EnforcementConfig {
        &self.config
    }
}

impl Drop for EnforcementLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

async fn run(
    enforcer: Arc<Enforcer>,
    config: EnforcementConfig,
    mut shutdown: mpsc::Receiver<()>,
) {
    let start = Instant::now();
    let mut surface = interval_at(start + config.surface_interval, config.surface_interval);
    surface.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sweep = interval_at(start + config.sweep_interval, config.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        surface_interval = %humantime::format_duration(config.surface_interval),
        sweep_interval = %humantime::format_duration(config.sweep_interval),
        "Enforcement loop started"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("Enforcement loop stopped");
                break;
            }

            _ = surface.tick() => {
                if !enforcer.should_run() {
                    info!("Kiosk mode inactive; enforcement loop exiting");
                    break;
                }
                if let SurfaceAction::Failed = enforcer.correct_surface() {
                    debug!("Surface correction will retry on the next tick");
                }
            }

            _ = sweep.tick() => {
                if !enforcer.should_run() {
                    info!("Kiosk mode inactive; enforcement loop exiting");
                    break;
                }
                match enforcer.sweep_processes() {
                    Ok(report) => debug!(
                        inspected = report.inspected,
                        terminated = report.terminated.len(),
                        refused = report.refused.len(),
                        "Process sweep complete"
                    ),
                    Err(e) => warn!(error = %e, "Process sweep aborted"),
                }
            }
        }
    }
}
