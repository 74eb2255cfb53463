//! Startup sequencing: yield, reclaim, bind.

use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};
use tracing::{info, warn};

use crate::error::{Result, SupervisorError};
use crate::launch::LaunchMode;
use crate::probe::LivenessProbe;
use crate::reclaim::PortReclaimer;

/// What startup decided.
#[derive(Debug)]
pub enum Startup {
    /// A healthy instance already serves the port and we were started by
    /// hand: exit 0 without binding.
    Yield,
    Bound(TcpListener),
}

/// Run the startup protocol for `addr`.
///
/// 1. Manual launch and a healthy instance answers: [`Startup::Yield`].
/// 2. Supervised launch: never yield; reclaim the port up front.
/// 3. Bind with address reuse. On `AddrInUse`, reclaim and retry, up to
///    `attempts` binds in total.
pub async fn acquire(
    addr: SocketAddr,
    mode: LaunchMode,
    attempts: u32,
    probe: &dyn LivenessProbe,
    reclaimer: &dyn PortReclaimer,
) -> Result<Startup> {
    let port = addr.port();

    match mode {
        LaunchMode::Manual => {
            if probe.is_alive().await {
                info!(port, "an instance is already running; yielding");
                return Ok(Startup::Yield);
            }
        }
        LaunchMode::Supervised => reclaim(reclaimer, port).await,
    }

    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match bind_reusable(addr) {
            Ok(listener) => {
                info!(%addr, attempt, "listening");
                return Ok(Startup::Bound(listener));
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!(port, attempt, attempts, "port in use");
                if attempt < attempts {
                    reclaim(reclaimer, port).await;
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SupervisorError::BindExhausted { port, attempts })
}

/// Bind with `SO_REUSEADDR` so a socket left in TIME_WAIT by a just-killed
/// instance does not block us.
pub fn bind_reusable(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn reclaim(reclaimer: &dyn PortReclaimer, port: u16) {
    match reclaimer.reclaim(port).await {
        Ok(pids) if !pids.is_empty() => info!(port, ?pids, "port reclaimed"),
        Ok(_) => {}
        Err(e) => warn!(port, "port reclamation failed: {e}"),
    }
}
