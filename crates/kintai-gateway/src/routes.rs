//! The route table.
//!
//! Every endpoint is one row of (method, path, handler). The table is checked
//! for duplicates before the router is built, so a conflicting row fails
//! startup with a readable error instead of an axum panic.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use thiserror::Error;

use crate::app::AppState;
use crate::http;

pub struct Route {
    pub method: Method,
    pub path: &'static str,
    pub handler: MethodRouter<Arc<AppState>>,
}

fn route(method: Method, path: &'static str, handler: MethodRouter<Arc<AppState>>) -> Route {
    Route {
        method,
        path,
        handler,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("duplicate route: {method} {path}")]
    Duplicate { method: String, path: String },
}

pub fn table() -> Vec<Route> {
    vec![
        route(Method::GET, "/health", get(http::health::health_handler)),
        route(Method::GET, "/remote-data", get(http::remote::remote_data)),
        route(Method::GET, "/feed", get(http::feed::feed_handler)),
        route(Method::GET, "/store/{name}", get(http::store::load_document)),
        route(Method::POST, "/store/{name}", post(http::store::save_document)),
        route(Method::GET, "/backup/list", get(http::backup::list_backups)),
        route(Method::GET, "/backup/read", get(http::backup::read_backup)),
        route(Method::POST, "/backup/now", post(http::backup::backup_now)),
        route(Method::POST, "/backup/restore", post(http::backup::restore_backup)),
        route(Method::GET, "/files", get(http::files::list_files)),
        route(Method::GET, "/files/read", get(http::files::read_file)),
        route(Method::GET, "/logs", get(http::logs::read_logs)),
        route(Method::GET, "/logs/dates", get(http::logs::log_dates)),
        route(Method::POST, "/restart", post(http::control::restart_handler)),
    ]
}

/// Reject any (method, path) pair declared twice.
pub fn check<'a>(pairs: impl IntoIterator<Item = (&'a Method, &'a str)>) -> Result<(), RouteError> {
    let mut seen = HashSet::new();
    for (method, path) in pairs {
        if !seen.insert((method.clone(), path)) {
            return Err(RouteError::Duplicate {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
    }
    Ok(())
}

/// Router holding every row of [`table`], one method router per path.
pub fn table_router() -> Result<Router<Arc<AppState>>, RouteError> {
    let rows = table();
    check(rows.iter().map(|r| (&r.method, r.path)))?;

    let mut by_path: BTreeMap<&'static str, MethodRouter<Arc<AppState>>> = BTreeMap::new();
    for row in rows {
        let merged = match by_path.remove(row.path) {
            Some(existing) => existing.merge(row.handler),
            None => row.handler,
        };
        by_path.insert(row.path, merged);
    }

    Ok(by_path
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| router.route(path, handler)))
}
