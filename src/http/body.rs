//! Response body module
//!
//! Every body is a lazy sequence of byte chunks. Buffers, chunk lists,
//! readers and generators are all normalized to the same iterator before
//! the transport sees them.

use hyper::body::Bytes;
use std::fmt;
use std::io::{self, Read};

/// Read size used when streaming from a `Read` source
pub const READ_CHUNK_SIZE: usize = 8192;

type Chunks = Box<dyn Iterator<Item = io::Result<Bytes>> + Send>;

/// Lazily produced response body
pub struct Body {
    chunks: Chunks,
    size_hint: Option<u64>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl Body {
    pub fn empty() -> Self {
        Self::with_chunks(Box::new(std::iter::empty()), Some(0))
    }

    /// A single byte buffer
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::with_chunks(Box::new(std::iter::once(Ok(bytes))), Some(len))
    }

    /// A finite list of chunks
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().collect();
        let len = chunks.iter().map(|c| c.len() as u64).sum();
        Self::with_chunks(Box::new(chunks.into_iter().map(Ok)), Some(len))
    }

    /// A file-like stream read in `READ_CHUNK_SIZE` pieces
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::with_chunks(Box::new(ReaderChunks::new(reader)), None)
    }

    /// A generator of chunks, possibly infinite
    pub fn from_generator<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = io::Result<Bytes>>,
        I::IntoIter: Send + 'static,
    {
        Self::with_chunks(Box::new(iter.into_iter()), None)
    }

    fn with_chunks(chunks: Chunks, size_hint: Option<u64>) -> Self {
        Self {
            chunks,
            size_hint,
            on_close: None,
        }
    }

    /// Register a cleanup hook run once, when the body is exhausted or
    /// dropped before that.
    #[must_use]
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let previous = self.on_close.take();
        self.on_close = Some(Box::new(move || {
            if let Some(previous) = previous {
                previous();
            }
            hook();
        }));
        self
    }

    /// Exact length when known up front
    pub const fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Drain the remaining chunks into one buffer
    pub fn collect_bytes(&mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        for chunk in self.by_ref() {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }

    fn close(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Iterator for Body {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.chunks.next();
        if next.is_none() {
            self.close();
        }
        next
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        self.close();
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(text)
    }
}

/// Pulls fixed-size chunks out of a reader until EOF
struct ReaderChunks<R> {
    reader: R,
    done: bool,
}

impl<R: Read> ReaderChunks<R> {
    const fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReaderChunks<R> {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0; READ_CHUNK_SIZE];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(Bytes::from(buf)));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
