use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{CollabError, FeedSource};
use crate::feed::FeedItem;

/// A feed endpoint returning a JSON array of items.
pub struct HttpFeedSource {
    name: String,
    url: String,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpFeedSource {
    pub fn new(name: String, url: String, timeout: Duration) -> Result<Self, CollabError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollabError::Failed {
                source_name: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            url,
            client,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn failed(&self, reason: impl ToString) -> CollabError {
        CollabError::Failed {
            source_name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<FeedItem>, CollabError> {
        let resp = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                CollabError::Timeout {
                    source_name: self.name.clone(),
                    ms: self.timeout_ms,
                }
            } else {
                self.failed(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.failed(format!("HTTP {status}")));
        }

        let mut items: Vec<FeedItem> = resp.json().await.map_err(|e| CollabError::InvalidData {
            source_name: self.name.clone(),
            reason: e.to_string(),
        })?;
        for item in &mut items {
            if item.source.is_empty() {
                item.source = self.name.clone();
            }
        }
        debug!(source = %self.name, count = items.len(), "feed fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let source = HttpFeedSource::new(
            "jobs".into(),
            format!("http://127.0.0.1:{port}/feed.json"),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, CollabError::Failed { .. } | CollabError::Timeout { .. }));
        assert_eq!(source.name(), "jobs");
    }
}
