// Layered configuration
// Sources in priority order: RESTWALK_* environment, the TOML file, built-in defaults

mod types;

use std::net::SocketAddr;
use thiserror::Error;

pub use types::{
    Config, DispatchConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Default config file, looked up without extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Environment variable prefix, e.g. `RESTWALK_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "RESTWALK";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid address '{addr}': {source}")]
    Address {
        addr: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    /// Load configuration from `config.toml` in the working directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (extension optional).
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_timeout", 30)?
            .set_default("performance.backlog", 128)?
            .set_default("http.server_name", "restwalk/0.1")?
            .set_default("http.max_body_size", 10 * 1024 * 1024)?
            .set_default("http.mount_path", "")?
            .set_default("dispatch.max_traversal_steps", 256)?
            .set_default("dispatch.max_delegations", 64)?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|source| ConfigError::Address { addr, source })
    }
}
