use std::fmt::Display;
use std::future::Future;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::schedule::Schedule;

/// Handle to a running background loop.
pub struct ScheduledTask {
    name: String,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the loop to stop after the current run, if any.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            error!(task = %self.name, "scheduled task panicked: {e}");
        }
    }
}

/// Spawn `job` on `schedule` until `cancel` fires.
///
/// With `run_at_start` the job runs once immediately before the first wait.
/// Errors are logged and the loop continues on its next tick.
pub fn spawn_task<F, Fut, E>(
    name: impl Into<String>,
    schedule: Schedule,
    run_at_start: bool,
    cancel: CancellationToken,
    mut job: F,
) -> ScheduledTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let name = name.into();
    let task_name = name.clone();
    let token = cancel.clone();

    let join = tokio::spawn(async move {
        info!(task = %task_name, ?schedule, "scheduled task started");

        if run_at_start {
            run_once(&task_name, &mut job).await;
        }

        loop {
            let delay = schedule.delay_from(&Local::now());
            debug!(task = %task_name, secs = delay.as_secs(), "next run scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => run_once(&task_name, &mut job).await,
                _ = token.cancelled() => {
                    info!(task = %task_name, "scheduled task shutting down");
                    break;
                }
            }
        }
    });

    ScheduledTask { name, cancel, join }
}

async fn run_once<F, Fut, E>(name: &str, job: &mut F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    match job().await {
        Ok(()) => debug!(task = %name, "scheduled run complete"),
        Err(e) => error!(task = %name, "scheduled run failed: {e}"),
    }
}
