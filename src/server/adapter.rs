//! Transport adapter
//!
//! Converts between hyper and the dispatch core. The request body is
//! buffered (bounded by `http.max_body_size`), dispatch runs on the
//! blocking pool, and the response body is streamed frame by frame.
//! Errors the core leaves uncaught are rendered here as 5xx responses.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Bytes, Frame, SizeHint};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::StatusCode;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{ClientError, Error};
use crate::handler::App;
use crate::http::{Body, Response};
use crate::logger::{self, AccessLogEntry, AccessLogFormat};

/// Chunks buffered between a streaming body and the connection
const STREAM_BUFFER: usize = 4;

/// Shared per-server conversion settings
#[derive(Debug)]
pub struct Adapter {
    app: Arc<App>,
    server_name: HeaderValue,
    max_body_size: u64,
    mount_path: String,
    /// `None` when access logging is off
    access_log: Option<AccessLogFormat>,
}

impl Adapter {
    pub fn new(app: Arc<App>, config: &Config) -> Self {
        let server_name = HeaderValue::from_str(&config.http.server_name).unwrap_or_else(|_| {
            logger::log_warning(&format!(
                "Invalid server_name '{}', using 'restwalk'",
                config.http.server_name
            ));
            HeaderValue::from_static("restwalk")
        });
        Self {
            app,
            server_name,
            max_body_size: config.http.max_body_size,
            mount_path: config.http.mount_path.clone(),
            access_log: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
        }
    }

    /// Serve one hyper request. Never fails: every outcome is a response.
    pub async fn handle<B>(
        &self,
        req: hyper::Request<B>,
        peer_addr: SocketAddr,
    ) -> Result<hyper::Response<ResponseBody>, Infallible>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let access = self.access_log.as_ref().map(|format| PendingAccessLog {
            entry: AccessLogEntry::from_request(
                peer_addr.ip().to_string(),
                &parts.method,
                &parts.uri,
                parts.version,
                &parts.headers,
            ),
            format: format.clone(),
            started,
            status: StatusCode::OK,
        });

        let response = match self.dispatch(parts, body).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        };
        Ok(self.build_response(response, access))
    }

    async fn dispatch<B>(&self, parts: hyper::http::request::Parts, body: B) -> Result<Response, ClientError>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.check_content_length(&parts.headers)?;
        let bytes = self.read_body(body).await?;

        let request = self
            .app
            .request()
            .method(parts.method)
            .uri(parts.uri.to_string())
            .version(parts.version)
            .headers(parts.headers)
            .body(bytes)
            .mount_path(self.mount_path.clone())
            .build()?;

        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let app = Arc::clone(&self.app);
        let outcome = tokio::task::spawn_blocking(move || app.handle(&request)).await;

        Ok(match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                logger::log_dispatch_error(&method, &path, &err);
                server_error_response(&err)
            }
            Err(join_err) => {
                logger::log_error(&format!("{method} {path} panicked: {join_err}"));
                Response::new(StatusCode::INTERNAL_SERVER_ERROR)
            }
        })
    }

    /// Reject declared bodies over the limit before reading them
    fn check_content_length(&self, headers: &hyper::HeaderMap) -> Result<(), ClientError> {
        let Some(value) = headers.get(CONTENT_LENGTH) else {
            return Ok(());
        };
        match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
            Some(size) if size > self.max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {})",
                    self.max_body_size
                ));
                Err(ClientError::payload_too_large())
            }
            Some(_) => Ok(()),
            None => Err(ClientError::bad_request()),
        }
    }

    async fn read_body<B>(&self, body: B) -> Result<Bytes, ClientError>
    where
        B: hyper::body::Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limit = usize::try_from(self.max_body_size).unwrap_or(usize::MAX);
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                logger::log_warning(&format!(
                    "Request body exceeded {} bytes while reading",
                    self.max_body_size
                ));
                Err(ClientError::payload_too_large())
            }
            Err(e) => {
                logger::log_warning(&format!("Failed to read request body: {e}"));
                Err(ClientError::bad_request())
            }
        }
    }

    fn build_response(&self, response: Response, access: Option<PendingAccessLog>) -> hyper::Response<ResponseBody> {
        let (status, headers, body) = response.into_parts();
        let access = access.map(|mut pending| {
            pending.status = status;
            pending
        });

        let mut out = hyper::Response::new(ResponseBody::new(body, access));
        *out.status_mut() = status;
        let out_headers = out.headers_mut();
        for (name, value) in headers {
            out_headers.append(name, value);
        }
        if !out_headers.contains_key(SERVER) {
            out_headers.insert(SERVER, self.server_name.clone());
        }
        out
    }
}

/// Render an error the core did not catch
fn server_error_response(err: &Error) -> Response {
    match err {
        Error::Server(e) => Response::new(e.status()),
        _ => Response::new(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Access log entry waiting for the body to finish
struct PendingAccessLog {
    entry: AccessLogEntry,
    format: AccessLogFormat,
    started: Instant,
    status: StatusCode,
}

enum Source {
    /// Chunks already in memory, iterated on the connection task
    Inline(Body),
    /// Chunks produced on the blocking pool
    Channel(mpsc::Receiver<io::Result<Bytes>>),
}

/// hyper body streaming a `Body`.
///
/// Dropping it mid-stream drops the underlying `Body`, which runs its
/// close hook.
pub struct ResponseBody {
    source: Source,
    size_hint: Option<u64>,
    sent: u64,
    access: Option<PendingAccessLog>,
}

impl ResponseBody {
    fn new(body: Body, access: Option<PendingAccessLog>) -> Self {
        let size_hint = body.size_hint();
        // Bodies with a known length are buffers or chunk lists; anything
        // else may block on I/O and is pumped from the blocking pool.
        let source = if size_hint.is_some() {
            Source::Inline(body)
        } else {
            Source::Channel(pump(body))
        };
        Self {
            source,
            size_hint,
            sent: 0,
            access,
        }
    }
}

fn pump(body: Body) -> mpsc::Receiver<io::Result<Bytes>> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::task::spawn_blocking(move || {
        for chunk in body {
            if tx.blocking_send(chunk).is_err() {
                // Receiver gone: client disconnected
                break;
            }
        }
    });
    rx
}

impl hyper::body::Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let next = match &mut this.source {
            Source::Inline(body) => body.next(),
            Source::Channel(rx) => match rx.poll_recv(cx) {
                Poll::Ready(next) => next,
                Poll::Pending => return Poll::Pending,
            },
        };
        Poll::Ready(next.map(|chunk| {
            chunk.map(|bytes| {
                this.sent += bytes.len() as u64;
                Frame::data(bytes)
            })
        }))
    }

    fn is_end_stream(&self) -> bool {
        self.size_hint == Some(0)
    }

    fn size_hint(&self) -> SizeHint {
        self.size_hint.map_or_else(SizeHint::default, SizeHint::with_exact)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        if let Some(mut pending) = self.access.take() {
            pending
                .entry
                .finish(pending.status.as_u16(), self.sent, pending.started.elapsed());
            logger::log_access(&pending.entry, &pending.format);
        }
    }
}
