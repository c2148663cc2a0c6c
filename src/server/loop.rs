// Server loop module
// Accepts connections until the shutdown notifier fires, then drains them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::adapter::Adapter;
use super::connection::{accept_connection, drain, ConnectionSettings};
use crate::logger;

/// Accept loop for one listener.
///
/// Once `shutdown` is notified the listener closes, open connections are
/// asked to finish their current response, and the loop waits up to
/// `settings.drain_timeout` for them before returning.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    adapter: Arc<Adapter>,
    settings: ConnectionSettings,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (stopping, _) = watch::channel(false);
    // Registered before the loop so a notification between accepts is not lost
    let stopped = shutdown.notified();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &adapter,
                        &active_connections,
                        settings,
                        stopping.subscribe(),
                    ),
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = &mut stopped => break,
        }
    }

    drop(listener);
    stopping.send_replace(true);
    logger::log_server_stop(active_connections.load(Ordering::SeqCst));
    let abandoned = drain(&active_connections, settings.drain_timeout).await;
    logger::log_drained(abandoned);
    Ok(())
}
