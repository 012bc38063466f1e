//! Network layer for Reel
//!
//! Provides the [`HttpClient`] interface, a hyper-backed implementation, and client
//! wrappers for content decoding and redirects.

mod client;
mod decoder;
mod redirect;

pub use client::{ClientResponse, HttpClient, HyperClient, OutboundBody, ResponseBody};
pub use decoder::ContentDecoder;
pub use redirect::RedirectFollower;

/// Idle pooled connections are closed after this many seconds
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Maximum idle pooled connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Default number of redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: usize = 20;
