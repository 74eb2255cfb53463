use std::time::Duration;

use async_trait::async_trait;
use kintai_supervisor::{exec, SupervisorError};
use serde_json::Value;
use tracing::info;

use super::{CollabError, Params, RemoteSource};

/// Longest slice of collaborator output carried into an error message.
const MAX_REASON_CHARS: usize = 500;

/// Runs an external program per request and parses its stdout as JSON.
///
/// Parameters are passed as `--<name> <v1,v2>` after the configured args.
pub struct CommandRemoteSource {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
    ready: bool,
}

impl CommandRemoteSource {
    pub fn new(name: impl Into<String>, program: String, args: Vec<String>, timeout: Duration) -> Self {
        // resolved once; /health must not touch the collaborator
        let ready = which::which(&program).is_ok();
        Self {
            name: name.into(),
            program,
            args,
            timeout,
            ready,
        }
    }

    fn argv(&self, params: &Params) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.args.len() + params.len() * 2);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        for (name, values) in params {
            argv.push(format!("--{name}"));
            argv.push(values.join(","));
        }
        argv
    }
}

#[async_trait]
impl RemoteSource for CommandRemoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn fetch(&self, params: &Params) -> Result<Value, CollabError> {
        let argv = self.argv(params);
        info!(source = %self.name, ?params, "invoking collaborator");

        let output = exec::run(&argv, self.timeout).await.map_err(|e| match e {
            SupervisorError::Timeout { ms } => CollabError::Timeout {
                source_name: self.name.clone(),
                ms,
            },
            other => CollabError::Failed {
                source_name: self.name.clone(),
                reason: other.to_string(),
            },
        })?;

        if !output.success() {
            return Err(CollabError::Failed {
                source_name: self.name.clone(),
                reason: format!(
                    "exit status {}: {}",
                    output.exit_code,
                    clip(&output.combined(), MAX_REASON_CHARS)
                ),
            });
        }

        serde_json::from_str(&output.stdout).map_err(|e| CollabError::InvalidData {
            source_name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
