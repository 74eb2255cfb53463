use kintai_logs::LogRegistry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "kintai_gateway=info,kintai=info";

/// stdout plus the rotating `server` stream. Returns false when the file
/// stream could not be opened (stdout logging still works).
pub fn init(logs: &LogRegistry) -> bool {
    let stream = logs.open_stream("server");
    let file_ok = stream.is_ok();
    let file_layer = stream
        .ok()
        .map(|s| fmt::layer().with_ansi(false).with_target(false).with_writer(s));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    file_ok
}
