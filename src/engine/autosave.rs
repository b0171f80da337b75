//! engine::autosave
//!
//! Periodic, cancellable flush of staged value edits.
//!
//! The timer runs as a tokio task; each flush runs on the blocking pool
//! since it does file I/O. A namespace with a structural operation in
//! flight is deferred by [`Project::flush`] and retried on the next tick.
//! Stopping the saver performs one final flush.
//!
//! [`AutoSaver::from_config`] honors the `[auto_save]` settings of the
//! project's configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::edits::FlushReport;
use super::project::Project;

/// Spawns auto-save tasks.
pub struct AutoSaver;

impl AutoSaver {
    /// Start auto-save as configured for `project`.
    ///
    /// Returns `None` when auto-save is disabled. Must be called from
    /// within a tokio runtime.
    pub fn from_config(project: Arc<Project>) -> Option<AutoSaveHandle> {
        let config = project.config();
        if !config.auto_save_enabled() {
            tracing::debug!("auto-save disabled");
            return None;
        }
        let interval = config.auto_save_interval();
        Some(Self::spawn(project, interval))
    }

    /// Start flushing `project` every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(project: Arc<Project>, interval: Duration) -> AutoSaveHandle {
        let (cancel, mut cancelled) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = flush(&project).await;
                        if !report.deferred.is_empty() {
                            tracing::debug!(deferred = report.deferred.len(), "auto-save deferred");
                        }
                    }
                    // Also fires when the handle is dropped.
                    _ = cancelled.changed() => break,
                }
            }

            flush(&project).await
        });

        tracing::debug!(interval_secs = interval.as_secs(), "auto-save started");
        AutoSaveHandle { cancel, task }
    }
}

/// Handle to a running auto-save task.
#[derive(Debug)]
pub struct AutoSaveHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<FlushReport>,
}

impl AutoSaveHandle {
    /// Ask the task to stop. It performs one last flush before exiting.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Cancel the timer and wait for the final flush.
    pub async fn stop(self) -> FlushReport {
        self.cancel();
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(error = %err, "auto-save task ended abnormally");
                FlushReport::default()
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn flush(project: &Arc<Project>) -> FlushReport {
    let project = Arc::clone(project);
    match tokio::task::spawn_blocking(move || project.flush()).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(error = %err, "flush task failed");
            FlushReport::default()
        }
    }
}
