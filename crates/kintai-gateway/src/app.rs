use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use kintai_cache::TtlCache;
use kintai_core::config::KintaiConfig;
use kintai_core::Clock;
use kintai_logs::LogRegistry;
use kintai_store::DocumentStore;
use kintai_supervisor::RestartCommand;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes::{self, RouteError};
use crate::sources::{FeedSource, RemoteSource};

/// Central shared state, passed as `Arc<AppState>` to every handler.
///
/// Everything a handler touches is owned here, so tests build independent
/// instances instead of sharing process-wide globals.
pub struct AppState {
    pub config: KintaiConfig,
    pub clock: Arc<dyn Clock>,
    pub started: Instant,
    /// Scrape results, short TTL.
    pub remote_cache: TtlCache<Value>,
    /// Aggregated feed results, long TTL.
    pub feed_cache: TtlCache<Value>,
    pub remote: Arc<dyn RemoteSource>,
    pub feeds: Vec<Arc<dyn FeedSource>>,
    pub store: DocumentStore,
    pub logs: Arc<LogRegistry>,
    pub restart: RestartCommand,
    /// Subsystem readiness, evaluated once at startup.
    pub subsystems: BTreeMap<String, bool>,
}

impl AppState {
    pub fn new(
        config: KintaiConfig,
        clock: Arc<dyn Clock>,
        logs: Arc<LogRegistry>,
        remote: Arc<dyn RemoteSource>,
        feeds: Vec<Arc<dyn FeedSource>>,
    ) -> Self {
        let remote_cache = TtlCache::with_clock(
            Duration::from_secs(config.cache.remote_ttl_secs),
            Arc::clone(&clock),
        );
        let feed_cache = TtlCache::with_clock(
            Duration::from_secs(config.cache.feed_ttl_secs),
            Arc::clone(&clock),
        );
        let store = DocumentStore::from_config(&config, Arc::clone(&clock));
        let restart = RestartCommand::resolve(
            &config.supervisor.label,
            config.supervisor.restart_command.as_deref(),
        );

        let mut subsystems = BTreeMap::new();
        subsystems.insert("scraper".to_string(), remote.is_ready());
        subsystems.insert("feed".to_string(), !feeds.is_empty());
        subsystems.insert("store".to_string(), store.probe_writable());
        subsystems.insert(
            "backup".to_string(),
            std::fs::create_dir_all(store.backup_dir()).is_ok(),
        );
        info!(?subsystems, "subsystems initialized");

        Self {
            config,
            clock,
            started: Instant::now(),
            remote_cache,
            feed_cache,
            remote,
            feeds,
            store,
            logs,
            restart,
            subsystems,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Assemble the full Axum router.
///
/// Fails if the route table declares the same (method, path) twice.
pub fn build_router(state: Arc<AppState>) -> Result<Router, RouteError> {
    let router = routes::table_router()?
        .fallback(crate::http::assets::static_fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    Ok(router)
}

/// One structured line per request.
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let resp = next.run(req).await;

    let status = resp.status().as_u16();
    let ms = started.elapsed().as_millis() as u64;
    if resp.status().is_server_error() {
        tracing::warn!(%method, %path, status, ms, "request failed");
    } else {
        info!(%method, %path, status, ms, "request");
    }
    resp
}
