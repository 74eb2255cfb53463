use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, SupervisorError};

/// Answers "is an instance already serving?".
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn check(&self) -> Result<()>;

    async fn is_alive(&self) -> bool {
        self.check().await.is_ok()
    }
}

/// `GET <url>` must answer 2xx within the timeout.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SupervisorError::Probe(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Probe the local health endpoint on `port`.
    pub fn local(port: u16, timeout: Duration) -> Result<Self> {
        Self::new(health_url(port), timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub fn health_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}/health")
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn check(&self) -> Result<()> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SupervisorError::Probe(e.to_string()))?;
        let status = resp.status();
        debug!(url = %self.url, %status, "health probe");
        if status.is_success() {
            Ok(())
        } else {
            Err(SupervisorError::Probe(format!("status {status}")))
        }
    }
}
