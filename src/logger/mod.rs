//! Server logging
//!
//! Free functions for each event the transport reports. Messages below the
//! configured level are skipped; before `init` everything goes to the
//! standard streams.

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};
pub use writer::{Level, Stream};

use crate::config::Config;
use crate::error::Error;
use std::net::SocketAddr;

/// Apply the configured level and open the log sinks. Call once, before
/// the server starts.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::set_level(config.logging.level);
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Route a line to its stream, or to stdout/stderr before `init`
fn emit(stream: Stream, message: &str) {
    match (writer::get(), stream) {
        (Some(w), _) => w.write(stream, message),
        (None, Stream::Access) => println!("{message}"),
        (None, Stream::Error) => eprintln!("{message}"),
    }
}

fn write_info(message: &str) {
    if writer::enabled(Level::Info) {
        emit(Stream::Access, message);
    }
}

fn write_error(level: Level, message: &str) {
    if writer::enabled(level) {
        emit(Stream::Error, message);
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    let mount = match config.http.mount_path.as_str() {
        "" => "/",
        path => path,
    };
    write_info(&format!("[Startup] restwalk serving http://{addr} at {mount}"));
    write_info(&format!(
        "[Startup] level={} body_limit={}B workers={} max_connections={}",
        config.logging.level,
        config.http.max_body_size,
        config.server.workers.map_or_else(|| "auto".to_string(), |n| n.to_string()),
        config.performance.max_connections.map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
    ));
    let files = [
        ("access", config.logging.access_log_file.as_deref()),
        ("error", config.logging.error_log_file.as_deref()),
    ];
    for (stream, path) in files {
        if let Some(path) = path {
            write_info(&format!("[Startup] {stream} log file: {path}"));
        }
    }
}

pub fn log_server_stop(active_connections: usize) {
    write_info(&format!(
        "[Shutdown] Listener closed, waiting for {active_connections} connection(s)"
    ));
}

/// Outcome of waiting for open connections at shutdown
pub fn log_drained(abandoned: usize) {
    if abandoned == 0 {
        write_info("[Shutdown] All connections closed");
    } else {
        write_error(
            Level::Warn,
            &format!("[WARN] Shutdown timed out, dropping {abandoned} open connection(s)"),
        );
    }
}

pub fn log_signal(name: &str) {
    write_info(&format!("[Signal] {name} received, shutting down"));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info_at(Level::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

/// Log a failure that escaped the dispatch core
pub fn log_dispatch_error(method: &str, path: &str, err: &Error) {
    write_error(Level::Error, &format!("[ERROR] {method} {path} failed: {err}"));
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_debug(message: &str) {
    write_info_at(Level::Debug, &format!("[DEBUG] {message}"));
}

fn write_info_at(level: Level, message: &str) {
    if writer::enabled(level) {
        emit(Stream::Access, message);
    }
}

/// Access lines ignore the level threshold
pub fn log_access(entry: &AccessLogEntry, format: &AccessLogFormat) {
    emit(Stream::Access, &entry.format(format));
}
