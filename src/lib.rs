//! restwalk: traversal-based web dispatch
//!
//! A request is answered by walking a tree of resources segment by segment,
//! invoking the resource found, and following any delegation it returns.
//! Resources choose a handler by method and content negotiation through a
//! `MethodTable`. The `server` module puts the core behind hyper.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod templating;
pub mod traversal;
