//! Server module
//!
//! Listener setup, the accept loop, per-connection serving and the
//! hyper adapter in front of the dispatch core.

pub mod adapter;
pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::Config;
use crate::handler::App;
use crate::logger;

pub use adapter::{Adapter, ResponseBody};
pub use connection::ConnectionSettings;
pub use listener::bind_listener;
pub use server_loop::start_server_loop;

/// Bind the configured address and serve `app` until SIGINT/SIGTERM.
pub async fn serve(app: App, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let listener = bind_listener(addr, config.performance.backlog)?;
    let adapter = Arc::new(Adapter::new(Arc::new(app), config));
    let settings = ConnectionSettings::from(&config.performance);

    let shutdown = Arc::new(Notify::new());
    signal::start_signal_handler(Arc::clone(&shutdown));

    logger::log_server_start(&addr, config);
    start_server_loop(listener, adapter, settings, shutdown).await?;
    Ok(())
}
