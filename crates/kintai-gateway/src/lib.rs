//! `kintai-gateway`: The HTTP front of the kintai service.
//!
//! Requests are routed through a declarative table ([`routes`]) to handlers
//! in [`http`]; each connection is served on its own tokio task, so a
//! multi-second scrape never delays `/health`. Expensive collaborator
//! results are kept in TTL caches owned by [`app::AppState`].

pub mod app;
pub mod background;
pub mod error;
pub mod feed;
pub mod http;
pub mod routes;
pub mod sources;
pub mod telemetry;

pub use app::{build_router, AppState};
pub use error::ApiError;
