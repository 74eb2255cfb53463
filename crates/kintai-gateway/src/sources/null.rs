use async_trait::async_trait;
use serde_json::Value;

use super::{CollabError, Params, RemoteSource};

/// Stand-in when no scraper is configured: never ready, every fetch fails.
pub struct NullSource {
    name: String,
}

impl NullSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl RemoteSource for NullSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn fetch(&self, _params: &Params) -> Result<Value, CollabError> {
        Err(CollabError::NotConfigured {
            source_name: self.name.clone(),
        })
    }
}
