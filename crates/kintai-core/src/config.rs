use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8899;
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Label the external process supervisor knows the server by.
pub const SERVICE_LABEL: &str = "com.kintai.server";
/// Set by the supervisor's launch definition for every managed process.
pub const MANAGED_ENV: &str = "KINTAI_MANAGED";

/// Top-level config (kintai.toml + KINTAI_* env overrides).
///
/// Every section has defaults, so an empty or missing file yields a working
/// configuration rooted at the current directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KintaiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// The service's own directory. Relative paths elsewhere in the config
    /// resolve against it, and `/files` is sandboxed to it.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    /// Directory holding the client assets served by the static fallback.
    /// Defaults to `<base_dir>/public`.
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            base_dir: default_base_dir(),
            static_dir: None,
        }
    }
}

/// Storage locations. `None` means "the conventional spot under base_dir".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: Option<String>,
    pub log_dir: Option<String>,
    pub archive_dir: Option<String>,
    /// Durable mirror location, typically a synced folder on another volume.
    pub backup_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for scraped attendance data.
    #[serde(default = "default_remote_ttl")]
    pub remote_ttl_secs: u64,
    /// Freshness window for aggregated feed results.
    #[serde(default = "default_feed_ttl")]
    pub feed_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote_ttl_secs: default_remote_ttl(),
            feed_ttl_secs: default_feed_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Logical log names; each maps to `<log_dir>/<name>.log`.
    #[serde(default = "default_streams")]
    pub streams: Vec<String>,
    /// Rotate once the active file grows past this many bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Numbered generations kept per stream (`.1` … `.N`).
    #[serde(default = "default_generations")]
    pub generations: usize,
    #[serde(default = "default_rotate_interval")]
    pub rotate_interval_secs: u64,
    /// Archive buckets older than this many days are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            streams: default_streams(),
            max_bytes: default_max_bytes(),
            generations: default_generations(),
            rotate_interval_secs: default_rotate_interval(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_local_generations")]
    pub local_generations: usize,
    #[serde(default = "default_mirror_generations")]
    pub mirror_generations: usize,
    /// Documents that get a durable mirrored copy on every save.
    #[serde(default = "default_mirrored")]
    pub mirrored: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            local_generations: default_local_generations(),
            mirror_generations: default_mirror_generations(),
            mirrored: default_mirrored(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_label")]
    pub label: String,
    /// Environment flag whose presence marks a supervisor-launched process.
    #[serde(default = "default_managed_env")]
    pub managed_env: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Upper bound for any supervisor or port-lookup command.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Delay between answering `POST /restart` and issuing the restart.
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
    #[serde(default = "default_bind_attempts")]
    pub bind_attempts: u32,
    /// Time given to the OS to release the socket after terminating its owner.
    #[serde(default = "default_reclaim_grace")]
    pub reclaim_grace_ms: u64,
    /// Full argv replacing the platform restart command.
    pub restart_command: Option<Vec<String>>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            managed_env: default_managed_env(),
            probe_timeout_secs: default_probe_timeout(),
            command_timeout_secs: default_command_timeout(),
            restart_delay_secs: default_restart_delay(),
            bind_attempts: default_bind_attempts(),
            reclaim_grace_ms: default_reclaim_grace(),
            restart_command: None,
        }
    }
}

/// External collaborators the gateway brokers access to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Hard limit for a single collaborator call.
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
    /// Browser-driven attendance scraper, invoked as a command.
    pub scraper: Option<CommandSourceConfig>,
    /// Feed endpoints, one per source name.
    #[serde(default)]
    pub feeds: Vec<FeedEndpointConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_source_timeout(),
            scraper: None,
            feeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSourceConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEndpointConfig {
    /// Source name as used in `?sources=`.
    pub name: String,
    /// Endpoint returning a JSON array of feed items.
    pub url: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_base_dir() -> String {
    ".".to_string()
}
fn default_remote_ttl() -> u64 {
    300
}
fn default_feed_ttl() -> u64 {
    3600
}
fn default_streams() -> Vec<String> {
    vec!["server".to_string(), "watchdog".to_string()]
}
fn default_max_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_generations() -> usize {
    5
}
fn default_rotate_interval() -> u64 {
    600
}
fn default_retention_days() -> u32 {
    30
}
fn default_local_generations() -> usize {
    3
}
fn default_mirror_generations() -> usize {
    30
}
fn default_mirrored() -> Vec<String> {
    vec!["calendar".to_string()]
}
fn default_label() -> String {
    SERVICE_LABEL.to_string()
}
fn default_managed_env() -> String {
    MANAGED_ENV.to_string()
}
fn default_probe_timeout() -> u64 {
    5
}
fn default_command_timeout() -> u64 {
    15
}
fn default_restart_delay() -> u64 {
    2
}
fn default_bind_attempts() -> u32 {
    3
}
fn default_reclaim_grace() -> u64 {
    1000
}
fn default_source_timeout() -> u64 {
    120
}

impl KintaiConfig {
    /// Load config from a TOML file with KINTAI_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.kintai/kintai.toml
    ///
    /// Nested keys are addressed with a double underscore, e.g.
    /// `KINTAI_SERVER__PORT=9000`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: KintaiConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("KINTAI_").split("__"))
            .extract()
            .map_err(|e| crate::error::KintaiError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.base_dir)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.resolve(self.server.static_dir.as_deref(), "public")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(self.paths.data_dir.as_deref(), "data")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(self.paths.log_dir.as_deref(), "logs")
    }

    pub fn archive_dir(&self) -> PathBuf {
        match self.paths.archive_dir.as_deref() {
            Some(dir) => self.resolve(Some(dir), ""),
            None => self.log_dir().join("archive"),
        }
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve(self.paths.backup_dir.as_deref(), "backup")
    }

    /// Absolute paths are kept; relative ones hang off `base_dir`.
    fn resolve(&self, configured: Option<&str>, fallback: &str) -> PathBuf {
        let raw = configured.unwrap_or(fallback);
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.kintai/kintai.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let cfg = KintaiConfig::default();
        assert_eq!(cfg.server.port, DEFAULT_PORT);
        assert_eq!(cfg.cache.remote_ttl_secs, 300);
        assert_eq!(cfg.cache.feed_ttl_secs, 3600);
        assert_eq!(cfg.store.local_generations, 3);
        assert_eq!(cfg.store.mirror_generations, 30);
        assert_eq!(cfg.store.mirrored, vec!["calendar".to_string()]);
        assert_eq!(cfg.supervisor.label, SERVICE_LABEL);
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let mut cfg = KintaiConfig::default();
        cfg.server.base_dir = "/srv/kintai".to_string();
        cfg.paths.backup_dir = Some("/mnt/cloud/kintai".to_string());

        assert_eq!(cfg.data_dir(), PathBuf::from("/srv/kintai/data"));
        assert_eq!(cfg.log_dir(), PathBuf::from("/srv/kintai/logs"));
        assert_eq!(cfg.archive_dir(), PathBuf::from("/srv/kintai/logs/archive"));
        assert_eq!(cfg.backup_dir(), PathBuf::from("/mnt/cloud/kintai"));
        assert_eq!(cfg.static_dir(), PathBuf::from("/srv/kintai/public"));
    }

    #[test]
    fn load_reads_toml_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kintai.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9100

[cache]
remote_ttl_secs = 60

[sources.scraper]
program = "python3"
args = ["sync_attendance.py"]
"#,
        )
        .expect("write");

        let cfg = KintaiConfig::load(path.to_str()).expect("load");
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.cache.remote_ttl_secs, 60);
        assert_eq!(cfg.cache.feed_ttl_secs, 3600);
        let scraper = cfg.sources.scraper.expect("scraper section");
        assert_eq!(scraper.program, "python3");
        assert_eq!(scraper.args, vec!["sync_attendance.py".to_string()]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = KintaiConfig::load(Some("/nonexistent/kintai.toml")).expect("load");
        assert_eq!(cfg.logs.generations, 5);
    }
}
