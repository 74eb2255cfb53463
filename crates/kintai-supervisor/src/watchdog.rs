//! One watchdog cycle: probe, restart on failure, report.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::probe::LivenessProbe;
use crate::restart::RestartCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Healthy,
    Restarted { output: String },
    RestartFailed { reason: String },
}

impl CycleOutcome {
    /// 0 unless the restart itself failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            CycleOutcome::RestartFailed { .. } => 1,
            _ => 0,
        }
    }
}

/// Probe once; if the service does not answer, force a restart. A failed
/// restart is reported, not retried; the next scheduled invocation tries
/// again.
pub async fn run_cycle(
    probe: &dyn LivenessProbe,
    restart: &RestartCommand,
    command_timeout: Duration,
    label: &str,
) -> CycleOutcome {
    match probe.check().await {
        Ok(()) => {
            info!("[OK] service responding");
            return CycleOutcome::Healthy;
        }
        Err(e) => warn!("[WARN] service unresponsive ({e}); restarting {label}"),
    }

    match restart.run(command_timeout).await {
        Ok(outcome) => {
            let output = if outcome.output.is_empty() {
                "(no output)".to_string()
            } else {
                outcome.output
            };
            info!("[OK] restart succeeded: {output}");
            CycleOutcome::Restarted { output }
        }
        Err(e) => {
            error!("[ERROR] restart failed: {e}");
            CycleOutcome::RestartFailed {
                reason: e.to_string(),
            }
        }
    }
}
