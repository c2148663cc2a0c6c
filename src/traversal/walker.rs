//! Resource resolution walker
//!
//! Walks the request path left to right. Each step hands the remaining
//! segments to the current resource, which claims some prefix and returns
//! the next resource. The walk stops as soon as the path is exhausted.

use super::resource::{NotFound, Resource};
use crate::error::Error;
use crate::http::Request;

/// Default cap on resolution steps for one request
pub const DEFAULT_MAX_STEPS: usize = 256;

/// Locates the terminal resource for a request
#[derive(Debug, Clone)]
pub struct Walker {
    not_found: Resource,
    max_steps: usize,
}

impl Default for Walker {
    fn default() -> Self {
        Self::new()
    }
}

impl Walker {
    pub fn new() -> Self {
        Self {
            not_found: NotFound::shared(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Resource returned whenever resolution fails
    #[must_use]
    pub fn with_not_found(mut self, not_found: Resource) -> Self {
        self.not_found = not_found;
        self
    }

    /// Cap on `resolve_child` calls; exceeding it is a server error.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub const fn not_found(&self) -> &Resource {
        &self.not_found
    }

    /// Find the resource answering `request`, starting at `root`.
    ///
    /// Failed resolution yields the not-found resource, never an error.
    /// Errors come from `resolve_child` itself or from the step cap.
    pub fn locate(&self, request: &Request, root: &Resource) -> Result<Resource, Error> {
        let mut resource = root.clone();
        let mut segments = request.remaining().clone();
        let mut steps = 0;

        while !segments.is_empty() {
            if steps == self.max_steps {
                return Err(Error::TraversalLimit {
                    path: request.path_segments().to_path(),
                    limit: self.max_steps,
                });
            }
            steps += 1;

            let Some(traverse) = resource.as_traverse() else {
                return Ok(self.not_found.clone());
            };
            let narrowed = request.narrow(segments.clone());
            match traverse.resolve_child(&narrowed, &segments)? {
                Some((child, rest)) => {
                    resource = child;
                    segments = rest;
                }
                None => return Ok(self.not_found.clone()),
            }
        }

        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::http::response;
    use crate::traversal::resource::{Child, HandlerResult, Respond, Traverse};
    use crate::traversal::Segments;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Named(&'static str);

    impl Respond for Named {
        fn respond(&self, _request: &Request) -> Result<HandlerResult, Error> {
            Ok(response::ok("text/plain", self.0).into())
        }
    }

    /// Claims one segment per step and records what it saw
    struct Recorder {
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Traverse for Recorder {
        fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
            self.seen.lock().unwrap().push(segments.as_slice().to_vec());
            let next = Resource::node(Self {
                seen: Arc::clone(&self.seen),
            });
            Ok(Some((next, segments.advance(1))))
        }
    }

    impl Respond for Recorder {
        fn respond(&self, _request: &Request) -> Result<HandlerResult, Error> {
            Ok(response::no_content().into())
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        children: HashMap<&'static str, Resource>,
    }

    impl Traverse for Counting {
        fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some((head, rest)) = segments.split_first() else {
                return Ok(None);
            };
            Ok(self.children.get(head).map(|child| (child.clone(), rest)))
        }
    }

    fn request(path: &str) -> Request {
        Request::blank(path).unwrap()
    }

    #[test]
    fn test_root_path_skips_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = Resource::traversable(Counting {
            calls: Arc::clone(&calls),
            children: HashMap::new(),
        });
        let found = Walker::new().locate(&request("/"), &root).unwrap();
        assert!(found.ptr_eq(&root));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_leaf_with_segments_left_is_not_found() {
        let walker = Walker::new();
        let root = Resource::invocable(Named("root"));
        let found = walker.locate(&request("/foo"), &root).unwrap();
        assert!(found.ptr_eq(walker.not_found()));
    }

    #[test]
    fn test_missing_child_is_not_found() {
        let walker = Walker::new();
        let root = Resource::traversable(Counting {
            calls: Arc::new(AtomicUsize::new(0)),
            children: HashMap::new(),
        });
        let found = walker.locate(&request("/baz"), &root).unwrap();
        assert!(found.ptr_eq(walker.not_found()));
    }

    #[test]
    fn test_child_is_located() {
        let foo = Resource::invocable(Named("foo"));
        let mut children = HashMap::new();
        children.insert("foo", foo.clone());
        let root = Resource::traversable(Counting {
            calls: Arc::new(AtomicUsize::new(0)),
            children,
        });
        let found = Walker::new().locate(&request("/foo"), &root).unwrap();
        assert!(found.ptr_eq(&foo));
    }

    #[test]
    fn test_walk_stops_at_end_of_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = Resource::traversable(Counting {
            calls: Arc::clone(&calls),
            children: HashMap::new(),
        });
        let mut children = HashMap::new();
        children.insert("dir", inner.clone());
        let root = Resource::traversable(Counting {
            calls: Arc::clone(&calls),
            children,
        });
        let found = Walker::new().locate(&request("/dir"), &root).unwrap();
        assert!(found.ptr_eq(&inner));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolution_is_left_to_right_and_greedy() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let root = Resource::node(Recorder {
            seen: Arc::clone(&seen),
        });
        Walker::new().locate(&request("/a/b/c"), &root).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["b".to_string(), "c".to_string()],
                vec!["c".to_string()],
            ]
        );
    }

    #[test]
    fn test_child_can_consume_everything() {
        struct Greedy;
        impl Traverse for Greedy {
            fn resolve_child(&self, request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
                assert_eq!(request.remaining(), segments);
                let joined = segments.as_slice().join(",");
                let child = Resource::from_fn(move |_r| Ok(response::ok("text/plain", joined.clone()).into()));
                Ok(Some((child, Segments::empty())))
            }
        }
        let root = Resource::traversable(Greedy);
        let found = Walker::new().locate(&request("/foo/bar"), &root).unwrap();
        assert!(found.as_respond().is_some());
    }

    #[test]
    fn test_resolve_errors_propagate() {
        struct Refuses;
        impl Traverse for Refuses {
            fn resolve_child(&self, _request: &Request, _segments: &Segments) -> Result<Option<Child>, Error> {
                Err(ClientError::forbidden().into())
            }
        }
        let err = Walker::new()
            .locate(&request("/secret"), &Resource::traversable(Refuses))
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_step_cap_is_a_server_error() {
        struct Stuck;
        impl Traverse for Stuck {
            fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
                Ok(Some((Resource::traversable(Self), segments.clone())))
            }
        }
        let err = Walker::new()
            .with_max_steps(8)
            .locate(&request("/loop"), &Resource::traversable(Stuck))
            .unwrap_err();
        assert!(matches!(err, Error::TraversalLimit { limit: 8, .. }));
    }
}
