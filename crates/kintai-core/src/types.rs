use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload of `GET /health`. Recomputed on every probe, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Subsystem name → initialized successfully.
    pub subsystems: BTreeMap<String, bool>,
}

impl HealthStatus {
    pub fn ok(version: &str, uptime_seconds: u64, subsystems: BTreeMap<String, bool>) -> Self {
        Self {
            status: "ok".to_string(),
            version: version.to_string(),
            uptime_seconds,
            subsystems,
        }
    }
}
