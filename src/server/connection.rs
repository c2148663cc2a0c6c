// Per-connection serving
// One accepted socket becomes one HTTP/1.1 connection on its own task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;

use super::adapter::Adapter;
use crate::config::PerformanceConfig;
use crate::logger;

/// Timeouts and the connection cap, in the units hyper and tokio take.
///
/// Only waiting for a request head is timed. A response body streams for
/// as long as its source keeps producing.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub keep_alive: bool,
    pub header_read_timeout: Duration,
    /// How long shutdown waits for open connections to finish
    pub drain_timeout: Duration,
    pub max_connections: Option<usize>,
}

impl From<&PerformanceConfig> for ConnectionSettings {
    fn from(config: &PerformanceConfig) -> Self {
        Self {
            keep_alive: config.keep_alive_timeout > 0,
            header_read_timeout: Duration::from_secs(config.read_timeout),
            drain_timeout: Duration::from_secs(config.shutdown_timeout),
            max_connections: config
                .max_connections
                .map(|max| usize::try_from(max).unwrap_or(usize::MAX)),
        }
    }
}

/// One counted open connection; the count drops with the guard.
struct ConnectionSlot(Arc<AtomicUsize>);

impl ConnectionSlot {
    /// Count a new connection, or undo the count and return `None` when
    /// `limit` connections are already open.
    fn acquire(open: &Arc<AtomicUsize>, limit: Option<usize>) -> Option<Self> {
        let before = open.fetch_add(1, Ordering::SeqCst);
        let slot = Self(Arc::clone(open));
        match limit {
            Some(limit) if before >= limit => {
                drop(slot);
                logger::log_warning(&format!(
                    "Connection limit of {limit} reached, refusing new connection"
                ));
                None
            }
            _ => Some(slot),
        }
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Take a slot for `stream` and serve it on a new task. Over the limit the
/// socket is closed at once. Once `stopping` turns true the connection
/// finishes its current response and closes.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    adapter: &Arc<Adapter>,
    open: &Arc<AtomicUsize>,
    settings: ConnectionSettings,
    stopping: watch::Receiver<bool>,
) {
    let Some(slot) = ConnectionSlot::acquire(open, settings.max_connections) else {
        return;
    };
    logger::log_connection_accepted(&peer_addr);
    tokio::spawn(serve(stream, peer_addr, Arc::clone(adapter), settings, stopping, slot));
}

async fn serve(
    stream: TcpStream,
    peer_addr: SocketAddr,
    adapter: Arc<Adapter>,
    settings: ConnectionSettings,
    mut stopping: watch::Receiver<bool>,
    _slot: ConnectionSlot,
) {
    let service = service_fn(move |req| {
        let adapter = Arc::clone(&adapter);
        async move { adapter.handle(req, peer_addr).await }
    });

    let connection = http1::Builder::new()
        .keep_alive(settings.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(settings.header_read_timeout)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let mut signalled = false;
    let result = loop {
        tokio::select! {
            result = connection.as_mut() => break result,
            _ = stopping.wait_for(|stop| *stop), if !signalled => {
                signalled = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    };
    if let Err(err) = result {
        logger::log_connection_error(&err);
    }
}

/// Wait until no connection is open or `limit` has passed. Returns how
/// many were still open.
pub async fn drain(open: &AtomicUsize, limit: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + limit;
    let mut poll = tokio::time::interval(Duration::from_millis(25));
    loop {
        let left = open.load(Ordering::SeqCst);
        if left == 0 || tokio::time::Instant::now() >= deadline {
            return left;
        }
        poll.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn performance(keep_alive: u64, read: u64, shutdown: u64) -> PerformanceConfig {
        PerformanceConfig {
            keep_alive_timeout: keep_alive,
            read_timeout: read,
            shutdown_timeout: shutdown,
            max_connections: Some(10),
            backlog: 128,
        }
    }

    #[test]
    fn test_settings_from_config() {
        let settings = ConnectionSettings::from(&performance(75, 30, 45));
        assert!(settings.keep_alive);
        assert_eq!(settings.header_read_timeout, Duration::from_secs(30));
        assert_eq!(settings.drain_timeout, Duration::from_secs(45));
        assert_eq!(settings.max_connections, Some(10));
    }

    #[test]
    fn test_keep_alive_disabled() {
        let settings = ConnectionSettings::from(&performance(0, 5, 10));
        assert!(!settings.keep_alive);
        assert_eq!(settings.header_read_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_drain_waits_for_release() {
        let open = Arc::new(AtomicUsize::new(0));
        let slot = ConnectionSlot::acquire(&open, None);
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(slot);
        });
        assert_eq!(drain(&open, Duration::from_secs(5)).await, 0);
        release.await.unwrap();

        let _held = ConnectionSlot::acquire(&open, None);
        assert_eq!(drain(&open, Duration::from_millis(50)).await, 1);
    }

    #[test]
    fn test_slots_respect_limit_and_release() {
        let open = Arc::new(AtomicUsize::new(0));
        let first = ConnectionSlot::acquire(&open, Some(2));
        let second = ConnectionSlot::acquire(&open, Some(2));
        assert!(first.is_some() && second.is_some());
        assert!(ConnectionSlot::acquire(&open, Some(2)).is_none());
        assert_eq!(open.load(Ordering::SeqCst), 2);

        drop(first);
        assert_eq!(open.load(Ordering::SeqCst), 1);
        assert!(ConnectionSlot::acquire(&open, None).is_some());
        assert_eq!(open.load(Ordering::SeqCst), 1);
    }
}
