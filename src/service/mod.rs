//! Talking to the note service's local clipper API.
//!
//! - [`transport`]: one HTTP request with typed failures
//! - [`locator`]: finds the service on a small port range
//! - [`connect`]: retries the locator until found or cancelled
//! - [`client`]: notebook/tag listing and note submission

pub mod client;
pub mod connect;
pub mod locator;
pub mod transport;

/// Path answered by a live clipper service.
pub const PING_PATH: &str = "/ping";

/// Exact `/ping` body identifying the service.
pub const SENTINEL: &str = "JoplinClipperServer";
