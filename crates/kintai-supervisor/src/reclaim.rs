//! Freeing the listening port from a stale instance.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::exec;

/// Best-effort removal of whatever holds `port`. Returns the PIDs signalled.
#[async_trait]
pub trait PortReclaimer: Send + Sync {
    async fn reclaim(&self, port: u16) -> Result<Vec<i32>>;
}

/// Finds listeners with `lsof`, sends them `SIGTERM`, then waits `grace` for
/// the OS to release the socket.
pub struct LsofReclaimer {
    lookup_timeout: Duration,
    grace: Duration,
}

impl LsofReclaimer {
    pub fn new(lookup_timeout: Duration, grace: Duration) -> Self {
        Self {
            lookup_timeout,
            grace,
        }
    }
}

#[async_trait]
impl PortReclaimer for LsofReclaimer {
    async fn reclaim(&self, port: u16) -> Result<Vec<i32>> {
        let argv = vec![
            "lsof".to_string(),
            "-ti".to_string(),
            format!("tcp:{port}"),
            "-sTCP:LISTEN".to_string(),
        ];
        // lsof exits 1 when nothing matches
        let output = exec::run(&argv, self.lookup_timeout).await?;
        let own = std::process::id() as i32;
        let pids = parse_pids(&output.stdout, own);
        if pids.is_empty() {
            return Ok(pids);
        }

        for pid in &pids {
            // Safety: plain kill(2); a vanished pid only yields ESRCH.
            let rc = unsafe { libc::kill(*pid as libc::pid_t, libc::SIGTERM) };
            if rc == 0 {
                info!(pid, port, "sent SIGTERM to port holder");
            } else {
                warn!(pid, port, "SIGTERM failed: {}", std::io::Error::last_os_error());
            }
        }
        tokio::time::sleep(self.grace).await;
        Ok(pids)
    }
}

/// One PID per line; our own PID and junk are dropped.
pub fn parse_pids(stdout: &str, own_pid: i32) -> Vec<i32> {
    let mut pids: Vec<i32> = stdout
        .lines()
        .filter_map(|l| l.trim().parse::<i32>().ok())
        .filter(|pid| *pid > 1 && *pid != own_pid)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}
