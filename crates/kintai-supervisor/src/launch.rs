//! Who started this process.

use tracing::debug;

/// How the process was launched decides what startup may do when the port
/// is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Started by a person. Yielding to a healthy running instance is fine.
    Manual,
    /// Started by the external supervisor, which relaunches on exit. Must
    /// never yield, or it respawns forever.
    Supervised,
}

impl LaunchMode {
    /// Supervised when `managed_env` is set, or when the parent is PID 1
    /// (the OS's root supervisor).
    pub fn detect(managed_env: &str) -> Self {
        let flag = std::env::var_os(managed_env).is_some_and(|v| !v.is_empty());
        // Safety: getppid has no preconditions.
        let ppid = unsafe { libc::getppid() };
        let mode = Self::from_signals(flag, ppid as i64);
        debug!(?mode, flag, ppid, "launch mode detected");
        mode
    }

    pub fn from_signals(managed_flag: bool, parent_pid: i64) -> Self {
        if managed_flag || parent_pid == 1 {
            LaunchMode::Supervised
        } else {
            LaunchMode::Manual
        }
    }

    pub fn is_supervised(self) -> bool {
        self == LaunchMode::Supervised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_or_init_parent_means_supervised() {
        assert_eq!(LaunchMode::from_signals(true, 4242), LaunchMode::Supervised);
        assert_eq!(LaunchMode::from_signals(false, 1), LaunchMode::Supervised);
        assert_eq!(LaunchMode::from_signals(false, 4242), LaunchMode::Manual);
    }
}
