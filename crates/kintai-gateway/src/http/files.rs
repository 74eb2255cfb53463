//! Read-only introspection of the service's own directory.
//!
//! Paths are canonicalized and must stay under the canonical base dir.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{blocking, ApiError};

/// Maximum entries returned by `GET /files`.
const MAX_ENTRIES: usize = 1_000;
/// Maximum characters returned by `GET /files/read`.
const MAX_READ_CHARS: usize = 200_000;

const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__"];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "ico", "bmp", "pdf", "xlsx", "xls", "docx", "zip", "gz",
    "tar", "db", "sqlite", "woff", "woff2", "ttf", "otf", "mp3", "mp4", "mov", "wav", "bin", "exe",
    "so", "dylib", "pyc",
];

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub modified: Option<String>,
}

/// GET /files: Files under the base dir, sorted, at most 1000.
pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let (files, truncated) = blocking(move || {
        let root = canonical_root(&state)?;
        let skip = skipped_trees(&state);
        let mut out = Vec::new();
        let truncated = walk(&root, &root, &skip, &mut out);
        Ok((out, truncated))
    })
    .await?;

    Ok(Json(json!({
        "total": files.len(),
        "truncated": truncated,
        "files": files,
    })))
}

/// GET /files/read?path=: Text content of one file inside the sandbox.
pub async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let requested = params
        .get("path")
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .ok_or_else(|| ApiError::bad_request("missing required parameter: path"))?;

    let value = blocking(move || {
        let root = canonical_root(&state)?;
        let path = resolve_in_sandbox(&root, &requested)?;
        if is_binary(&path) {
            return Err(ApiError::bad_request(format!("binary file not readable: {requested}")));
        }
        if !path.is_file() {
            return Err(ApiError::bad_request(format!("not a file: {requested}")));
        }

        let bytes = fs::read(&path).map_err(|e| ApiError::internal(format!("read {requested}: {e}")))?;
        let text = String::from_utf8_lossy(&bytes);
        let (content, truncated) = truncate_chars(&text, MAX_READ_CHARS);

        Ok(json!({
            "path": relative(&root, &path),
            "size": bytes.len(),
            "truncated": truncated,
            "content": content,
        }))
    })
    .await?;

    Ok(Json(value))
}

fn canonical_root(state: &AppState) -> Result<PathBuf, ApiError> {
    state
        .config
        .base_dir()
        .canonicalize()
        .map_err(|e| ApiError::internal(format!("base dir unavailable: {e}")))
}

/// Log archive and backup trees are not browsable through `/files`.
fn skipped_trees(state: &AppState) -> Vec<PathBuf> {
    [state.logs.archive_dir(), state.store.backup_dir()]
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect()
}

/// Canonical form of `requested` (relative to `root`), rejected unless it
/// stays inside `root` and touches no hidden (dot-prefixed) entry.
pub fn resolve_in_sandbox(root: &Path, requested: &str) -> Result<PathBuf, ApiError> {
    let relative = Path::new(requested.trim_start_matches('/'));
    if has_hidden_component(relative) {
        return Err(ApiError::forbidden(format!("hidden path not readable: {requested}")));
    }
    let canonical = root
        .join(relative)
        .canonicalize()
        .map_err(|_| ApiError::not_found(format!("no such file: {requested}")))?;
    let Ok(inside) = canonical.strip_prefix(root) else {
        return Err(ApiError::forbidden(format!("path outside sandbox: {requested}")));
    };
    // a visible symlink may still point at a hidden target
    if has_hidden_component(inside) {
        return Err(ApiError::forbidden(format!("hidden path not readable: {requested}")));
    }
    Ok(canonical)
}

fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

pub fn is_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Depth-first, name-ordered walk. Returns true when the cap cut it short.
fn walk(root: &Path, dir: &Path, skip: &[PathBuf], out: &mut Vec<FileEntry>) -> bool {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return false;
    };
    let mut entries: Vec<_> = read_dir.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };

        if meta.is_dir() {
            if SKIPPED_DIRS.contains(&name.as_str()) || skip.iter().any(|s| path.starts_with(s)) {
                continue;
            }
            if walk(root, &path, skip, out) {
                return true;
            }
        } else if meta.is_file() {
            if out.len() >= MAX_ENTRIES {
                return true;
            }
            out.push(FileEntry {
                path: relative(root, &path),
                size: meta.len(),
                modified: meta
                    .modified()
                    .ok()
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
            });
        }
    }
    false
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}
