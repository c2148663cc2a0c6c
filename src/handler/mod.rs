//! Request handler module
//!
//! Top-level dispatch entry point shared by every transport, and the
//! resource that mounts one app inside another.

pub mod app;
pub mod mount;

pub use app::App;
pub use mount::Mount;
