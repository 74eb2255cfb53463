use std::time::Duration;

use clap::Parser;
use kintai_core::config::KintaiConfig;
use kintai_logs::LogRegistry;
use kintai_supervisor::{run_cycle, HttpProbe, RestartCommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Probe the kintai service once; force a restart if it does not answer.
///
/// Meant to be run on a fixed interval by the OS scheduler.
#[derive(Debug, Parser)]
#[command(name = "kintai-watchdog", version)]
struct Args {
    /// Config file (default: $KINTAI_CONFIG, then ~/.kintai/kintai.toml)
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.or_else(|| std::env::var("KINTAI_CONFIG").ok());
    let load = KintaiConfig::load(config_path.as_deref());
    let config = load.as_ref().cloned().unwrap_or_default();

    // Under the supervisor stdout already goes to the watchdog log.
    let managed = std::env::var_os(&config.supervisor.managed_env).is_some();
    let file_layer = if managed {
        None
    } else {
        LogRegistry::from_config(&config)
            .open_stream("watchdog")
            .ok()
            .map(|stream| fmt::layer().with_ansi(false).with_writer(stream))
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "kintai=info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Err(e) = &load {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    let sup = &config.supervisor;
    let probe = HttpProbe::local(config.server.port, Duration::from_secs(sup.probe_timeout_secs))?;
    let restart = RestartCommand::resolve(&sup.label, sup.restart_command.as_deref());

    let outcome = run_cycle(
        &probe,
        &restart,
        Duration::from_secs(sup.command_timeout_secs),
        &sup.label,
    )
    .await;

    std::process::exit(outcome.exit_code());
}
