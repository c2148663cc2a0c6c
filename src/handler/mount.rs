//! Nested applications
//!
//! `Mount` hands everything below its position in the tree to another
//! `App`. The nested app sees the segments consumed on the way down as its
//! mount path and the rest as its own path, so it resolves and builds URLs
//! as if it were served on its own under that prefix.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::sync::Arc;

use super::App;
use crate::error::Error;
use crate::http::Request;
use crate::traversal::{Child, HandlerResult, Resource, Respond, Segments, Traverse};

/// Bytes escaped when a decoded segment is written back into a path
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A resource that forwards to a nested `App`
pub struct Mount {
    app: Arc<App>,
}

impl Mount {
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }

    /// `Mount::new(app)` as a tree node
    pub fn resource(app: App) -> Resource {
        Resource::node(Self::new(app))
    }
}

impl Traverse for Mount {
    /// Claims every remaining segment; the nested app resolves them
    fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
        let entry = Entry {
            app: Arc::clone(&self.app),
            remaining: segments.clone(),
        };
        Ok(Some((Resource::invocable(entry), Segments::empty())))
    }
}

impl Respond for Mount {
    /// Invoked directly, the mount claims no further path: every segment
    /// becomes part of the mount point.
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        let remaining = request.path_segments().advance(usize::MAX);
        forward(&self.app, request, &remaining)
    }
}

/// The mount with the unconsumed suffix captured during resolution
struct Entry {
    app: Arc<App>,
    remaining: Segments,
}

impl Respond for Entry {
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        forward(&self.app, request, &self.remaining)
    }
}

fn forward(app: &App, request: &Request, remaining: &Segments) -> Result<HandlerResult, Error> {
    let path = request.path_segments();
    let consumed = path.consumed_by(remaining).unwrap_or(0);

    let mut mount_path = request.mount_path().trim_end_matches('/').to_string();
    for segment in path.iter().take(consumed) {
        push_segment(&mut mount_path, segment);
    }
    let mut uri = mount_path.clone();
    for segment in remaining.iter() {
        push_segment(&mut uri, segment);
    }
    if uri.is_empty() {
        uri.push('/');
    }
    if let Some(query) = request.uri().query() {
        uri.push('?');
        uri.push_str(query);
    }

    let nested = app
        .request()
        .method(request.method().clone())
        .uri(uri)
        .version(request.version())
        .headers(request.headers().clone())
        .body(request.body().clone())
        .mount_path(mount_path)
        .build()?;
    app.handle(&nested).map(HandlerResult::from)
}

fn push_segment(path: &mut String, segment: &str) {
    path.push('/');
    path.extend(utf8_percent_encode(segment, SEGMENT));
}
