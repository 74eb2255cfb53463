//! Bounded external command execution.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, SupervisorError};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined, trimmed.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }
}

/// Run `argv` (no shell) and collect its output, killing the child when
/// `timeout` elapses.
pub async fn run(argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let (program, args) = argv.split_first().ok_or(SupervisorError::EmptyCommand)?;
    debug!(program = %program, ?args, "exec");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SupervisorError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    // wait_with_output consumes the child; keep the pid for the kill path.
    let pid = child.id();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(child.wait_with_output().await);
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(Ok(output))) => Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
        Ok(Ok(Err(e))) => Err(SupervisorError::Io(e)),
        Ok(Err(_)) => Err(SupervisorError::Spawn {
            program: program.clone(),
            reason: "wait task ended unexpectedly".to_string(),
        }),
        Err(_elapsed) => {
            if let Some(raw_pid) = pid {
                warn!(program = %program, pid = raw_pid, "command timed out, killing");
                // Safety: raw_pid is our direct child and has not been reaped.
                unsafe {
                    libc::kill(raw_pid as libc::pid_t, libc::SIGKILL);
                }
            }
            Err(SupervisorError::Timeout {
                ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Like [`run`], but a non-zero exit becomes [`SupervisorError::CommandFailed`].
pub async fn run_checked(argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let output = run(argv, timeout).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(SupervisorError::CommandFailed {
            program: argv.first().cloned().unwrap_or_default(),
            code: output.exit_code,
            output: output.combined(),
        })
    }
}
