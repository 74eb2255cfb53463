use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use kintai_core::clock::SystemClock;
use kintai_core::config::KintaiConfig;
use kintai_gateway::{background, build_router, sources, telemetry, AppState};
use kintai_logs::LogRegistry;
use kintai_supervisor::{acquire, HttpProbe, LaunchMode, LsofReclaimer, Startup};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Local attendance-data gateway.
#[derive(Debug, Parser)]
#[command(name = "kintai-gateway", version)]
struct Args {
    /// Config file (default: $KINTAI_CONFIG, then ~/.kintai/kintai.toml)
    #[arg(long)]
    config: Option<String>,
    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.or_else(|| std::env::var("KINTAI_CONFIG").ok());
    let load = KintaiConfig::load(config_path.as_deref());
    let mut config = load.as_ref().cloned().unwrap_or_default();
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let logs = Arc::new(LogRegistry::from_config(&config));
    let file_logging = telemetry::init(&logs);

    if let Err(e) = &load {
        warn!("Config load failed ({}), using defaults", e);
    }
    if !file_logging {
        warn!(dir = %logs.log_dir().display(), "server log file unavailable; logging to stdout only");
    }

    let sup = &config.supervisor;
    let mode = LaunchMode::detect(&sup.managed_env);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.server.bind, config.server.port))?;

    let probe = HttpProbe::local(addr.port(), Duration::from_secs(sup.probe_timeout_secs))?;
    let reclaimer = LsofReclaimer::new(
        Duration::from_secs(sup.command_timeout_secs),
        Duration::from_millis(sup.reclaim_grace_ms),
    );

    info!(?mode, %addr, "kintai gateway starting");
    let listener = match acquire(addr, mode, sup.bind_attempts, &probe, &reclaimer).await? {
        Startup::Yield => {
            println!("kintai is already running on port {}.", addr.port());
            println!("Stop the supervised service first, or start with --port to run a second copy.");
            return Ok(());
        }
        Startup::Bound(listener) => listener,
    };

    let (remote, feeds) = sources::from_config(&config.sources)?;
    let rotate_every = config.logs.rotate_interval_secs;
    let state = Arc::new(AppState::new(
        config,
        Arc::new(SystemClock),
        Arc::clone(&logs),
        remote,
        feeds,
    ));

    let cancel = CancellationToken::new();
    let tasks = background::spawn(Arc::clone(&logs), rotate_every, cancel.clone());

    let router = build_router(state)?;
    info!(%addr, "kintai gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    for task in tasks {
        task.shutdown().await;
    }
    info!("kintai gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }
    info!("shutdown requested");
}
