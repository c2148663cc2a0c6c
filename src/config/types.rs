// Configuration types module
// Shapes deserialized from the layered sources in `config/mod.rs`

use serde::Deserialize;

use crate::logger::{AccessLogFormat, Level};
use crate::traversal::{DEFAULT_MAX_DELEGATIONS, DEFAULT_MAX_STEPS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Runtime worker threads; tokio picks one per core when absent
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Where log lines go and which ones are kept.
///
/// An unknown `level` fails the load. `access_log_format` accepts
/// `combined`, `common`, `json`, or any `$variable` pattern.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Level,
    pub access_log: bool,
    #[serde(default)]
    pub access_log_format: AccessLogFormat,
    /// Append access lines here instead of stdout
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Append warnings and failures here instead of stderr
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Socket and connection tuning; timeouts in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Zero turns keep-alive off
    pub keep_alive_timeout: u64,
    /// Limit on receiving a request head
    pub read_timeout: u64,
    /// Limit on waiting for open connections at shutdown
    pub shutdown_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
    #[serde(default = "PerformanceConfig::default_backlog")]
    pub backlog: i32,
}

impl PerformanceConfig {
    const fn default_backlog() -> i32 {
        128
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Sent as the `Server` header
    pub server_name: String,
    /// Request bodies above this many bytes get 413
    pub max_body_size: u64,
    /// Leading path removed before traversal; empty mounts at `/`
    #[serde(default)]
    pub mount_path: String,
}

/// Per-request caps on `resolve_child` calls and delegations
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    pub max_traversal_steps: usize,
    pub max_delegations: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_traversal_steps: DEFAULT_MAX_STEPS,
            max_delegations: DEFAULT_MAX_DELEGATIONS,
        }
    }
}
