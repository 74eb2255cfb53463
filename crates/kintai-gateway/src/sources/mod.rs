//! Adapters for the slow external collaborators.
//!
//! The gateway only sees these traits; what a scraper or feed does
//! internally is out of its hands. Every call carries a timeout.

pub mod command;
pub mod http_feed;
pub mod null;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kintai_core::config::SourcesConfig;
use kintai_core::KintaiError;
use serde_json::Value;
use thiserror::Error;

use crate::feed::FeedItem;

pub use command::CommandRemoteSource;
pub use http_feed::HttpFeedSource;
pub use null::NullSource;

/// Normalized request parameters: name → sorted values.
pub type Params = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("{source_name} is not configured")]
    NotConfigured { source_name: String },

    #[error("{source_name} failed: {reason}")]
    Failed { source_name: String, reason: String },

    #[error("{source_name} timed out after {ms}ms")]
    Timeout { source_name: String, ms: u64 },

    #[error("{source_name} returned invalid data: {reason}")]
    InvalidData { source_name: String, reason: String },
}

impl From<CollabError> for KintaiError {
    fn from(e: CollabError) -> Self {
        let reason = e.to_string();
        match e {
            CollabError::Timeout { ms, .. } => KintaiError::Timeout { ms },
            CollabError::NotConfigured { source_name }
            | CollabError::Failed { source_name, .. }
            | CollabError::InvalidData { source_name, .. } => {
                KintaiError::Collaborator { source_name, reason }
            }
        }
    }
}

/// The expensive attendance scrape behind `/remote-data`.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the collaborator looked usable at startup. Must be cheap.
    fn is_ready(&self) -> bool;

    async fn fetch(&self, params: &Params) -> Result<Value, CollabError>;
}

/// One named source of feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<FeedItem>, CollabError>;
}

/// Build the configured collaborators.
pub fn from_config(
    config: &SourcesConfig,
) -> Result<(Arc<dyn RemoteSource>, Vec<Arc<dyn FeedSource>>), CollabError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let remote: Arc<dyn RemoteSource> = match &config.scraper {
        Some(cmd) => Arc::new(CommandRemoteSource::new(
            "scraper",
            cmd.program.clone(),
            cmd.args.clone(),
            timeout,
        )),
        None => Arc::new(NullSource::new("scraper")),
    };

    let feeds = config
        .feeds
        .iter()
        .map(|f| {
            HttpFeedSource::new(f.name.clone(), f.url.clone(), timeout)
                .map(|s| Arc::new(s) as Arc<dyn FeedSource>)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((remote, feeds))
}
