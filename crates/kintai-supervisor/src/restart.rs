//! Forced restart through the external process supervisor.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::Result;
use crate::exec;

/// What the supervisor said when asked to restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartOutcome {
    pub command: String,
    pub output: String,
}

/// The argv that makes the supervisor kill and relaunch the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartCommand {
    argv: Vec<String>,
}

impl RestartCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// The configured override, or the platform's supervisor command for
    /// `label`.
    pub fn resolve(label: &str, override_argv: Option<&[String]>) -> Self {
        match override_argv {
            Some(argv) if !argv.is_empty() => Self::new(argv.to_vec()),
            _ => Self::for_platform(label),
        }
    }

    #[cfg(target_os = "macos")]
    pub fn for_platform(label: &str) -> Self {
        // Safety: getuid has no preconditions.
        let uid = unsafe { libc::getuid() };
        Self::new(vec![
            "launchctl".into(),
            "kickstart".into(),
            "-k".into(),
            format!("gui/{uid}/{label}"),
        ])
    }

    #[cfg(not(target_os = "macos"))]
    pub fn for_platform(label: &str) -> Self {
        Self::new(vec![
            "systemctl".into(),
            "--user".into(),
            "restart".into(),
            label.to_string(),
        ])
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    /// Run the command once. A non-zero exit, spawn failure or timeout is an
    /// error; the output is kept either way for the log.
    pub async fn run(&self, timeout: Duration) -> Result<RestartOutcome> {
        let output = exec::run_checked(&self.argv, timeout).await?;
        Ok(RestartOutcome {
            command: self.display(),
            output: output.combined(),
        })
    }
}

/// Issue `command` after `delay` on a background task, so the caller's
/// response can be flushed before the supervisor kills this process.
pub fn schedule_restart(command: RestartCommand, delay: Duration, timeout: Duration) -> JoinHandle<()> {
    info!(command = %command.display(), delay_ms = delay.as_millis() as u64, "restart scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match command.run(timeout).await {
            Ok(outcome) => info!(command = %outcome.command, output = %outcome.output, "restart issued"),
            Err(e) => error!(command = %command.display(), "restart failed: {e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SupervisorError;

    #[test]
    fn override_wins_over_platform_default() {
        let custom = vec!["true".to_string()];
        assert_eq!(
            RestartCommand::resolve("com.kintai.server", Some(custom.as_slice())).argv(),
            custom.as_slice()
        );
        let platform = RestartCommand::resolve("com.kintai.server", None);
        assert!(platform.display().contains("com.kintai.server"));
        // an empty override falls back too
        let empty: Vec<String> = Vec::new();
        assert_eq!(
            RestartCommand::resolve("x", Some(empty.as_slice())),
            RestartCommand::for_platform("x")
        );
    }

    #[tokio::test]
    async fn failing_restart_is_an_error() {
        let cmd = RestartCommand::new(vec!["sh".into(), "-c".into(), "echo nope >&2; exit 4".into()]);
        match cmd.run(Duration::from_secs(5)).await {
            Err(SupervisorError::CommandFailed { code, output, .. }) => {
                assert_eq!(code, 4);
                assert_eq!(output, "nope");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scheduled_restart_waits_for_delay() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("restarted");
        let cmd = RestartCommand::new(vec!["touch".into(), marker.display().to_string()]);

        let handle = schedule_restart(cmd, Duration::from_millis(200), Duration::from_secs(5));
        assert!(!marker.exists());
        handle.await.unwrap();
        assert!(marker.exists());
    }
}
