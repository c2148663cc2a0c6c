//! Path segment cursor
//!
//! `Segments` is the unconsumed suffix of a request path. Cursors share one
//! decoded segment list; narrowing produces a new cursor and never touches
//! the one it came from.

use percent_encoding::percent_decode_str;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientError;

/// Ordered, decoded, not yet consumed path segments
#[derive(Clone)]
pub struct Segments {
    all: Arc<[String]>,
    start: usize,
}

impl Segments {
    pub fn empty() -> Self {
        Self {
            all: Arc::from(Vec::new()),
            start: 0,
        }
    }

    /// Build a cursor over already decoded segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let all: Vec<String> = segments.into_iter().map(Into::into).collect();
        Self {
            all: Arc::from(all),
            start: 0,
        }
    }

    /// Split a raw URL path into percent-decoded segments.
    ///
    /// `/` has no segments, `/a/` ends with an empty segment and interior
    /// empty segments are kept. Segments that do not decode to UTF-8 are a
    /// bad request.
    pub fn parse(path: &str) -> Result<Self, ClientError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let mut decoded = Vec::new();
        for raw in trimmed.split('/') {
            let Ok(segment) = percent_decode_str(raw).decode_utf8() else {
                return Err(ClientError::bad_request());
            };
            decoded.push(segment.into_owned());
        }
        Ok(Self::new(decoded))
    }

    /// Parse `path` after removing the `mount` prefix. Paths outside the
    /// mount point yield `None`.
    pub fn parse_mounted(path: &str, mount: &str) -> Result<Option<Self>, ClientError> {
        let mount = mount.trim_end_matches('/');
        if mount.is_empty() {
            return Self::parse(path).map(Some);
        }
        match path.strip_prefix(mount) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => Self::parse(rest).map(Some),
            _ => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.all.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&str> {
        self.all.get(self.start).map(String::as_str)
    }

    /// Cursor with the first `n` segments consumed (saturating)
    #[must_use]
    pub fn advance(&self, n: usize) -> Self {
        Self {
            all: Arc::clone(&self.all),
            start: (self.start + n).min(self.all.len()),
        }
    }

    /// Leading segment plus the cursor past it
    pub fn split_first(&self) -> Option<(&str, Self)> {
        self.first().map(|head| (head, self.advance(1)))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.all[self.start..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.as_slice().iter().map(String::as_str)
    }

    /// How many segments separate this cursor from a later one over the
    /// same path, `None` if `later` is not a suffix of this cursor.
    pub fn consumed_by(&self, later: &Self) -> Option<usize> {
        if !Arc::ptr_eq(&self.all, &later.all) || later.start < self.start {
            return None;
        }
        Some(later.start - self.start)
    }

    /// Remaining segments rendered back as a path
    pub fn to_path(&self) -> String {
        let mut path = String::new();
        for segment in self.iter() {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }
}

impl Default for Segments {
    fn default() -> Self {
        Self::empty()
    }
}

/// Cursors are equal when their unconsumed segments are
impl PartialEq for Segments {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Segments {}

impl fmt::Debug for Segments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for Segments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(path: &str) -> Vec<String> {
        Segments::parse(path).unwrap().as_slice().to_vec()
    }

    #[test]
    fn test_root_has_no_segments() {
        assert!(Segments::parse("/").unwrap().is_empty());
        assert!(Segments::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_trailing_slash_is_a_segment() {
        assert_eq!(parsed("/foo"), vec!["foo"]);
        assert_eq!(parsed("/foo/"), vec!["foo", ""]);
        assert_eq!(parsed("/a//b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(parsed("/foo%2Bbar%40example.com"), vec!["foo+bar@example.com"]);
        assert_eq!(parsed("/a%2Fb/c"), vec!["a/b", "c"]);
        assert_eq!(parsed("/caf%C3%A9"), vec!["café"]);
        assert_eq!(parsed("/foo+bar"), vec!["foo+bar"]);
    }

    #[test]
    fn test_invalid_utf8_is_bad_request() {
        let err = Segments::parse("/%FF").unwrap_err();
        assert_eq!(err.status(), hyper::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_mount_prefix() {
        let base = Segments::parse_mounted("/base/foo", "/base").unwrap().unwrap();
        assert_eq!(base.as_slice(), ["foo"]);
        let root = Segments::parse_mounted("/base", "/base/").unwrap().unwrap();
        assert!(root.is_empty());
        assert!(Segments::parse_mounted("/basement", "/base").unwrap().is_none());
        assert!(Segments::parse_mounted("/other", "/base").unwrap().is_none());
    }

    #[test]
    fn test_narrowing_leaves_original_intact() {
        let all = Segments::new(["a", "b", "c"]);
        let (head, rest) = all.split_first().unwrap();
        assert_eq!(head, "a");
        assert_eq!(rest.as_slice(), ["b", "c"]);
        assert_eq!(all.len(), 3);
        assert_eq!(all.consumed_by(&rest), Some(1));
        assert_eq!(rest.consumed_by(&all), None);
        assert_eq!(all.advance(10).len(), 0);
    }

    #[test]
    fn test_to_path() {
        assert_eq!(Segments::new(["a", "b"]).to_path(), "/a/b");
        assert_eq!(Segments::empty().to_path(), "/");
        assert_eq!(Segments::new(["a", ""]).to_string(), "/a/");
    }
}
