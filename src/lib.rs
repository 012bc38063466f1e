//! Reel - HTTP interaction recorder and replayer
//!
//! Wraps an HTTP client so that the first run records every exchange to a JSON
//! cassette and later runs replay the cassette instead of touching the network.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::multiple_crate_versions
)]

pub mod agent;
pub mod config;
pub mod error;
pub mod headers;
pub mod network;
pub mod recording;
pub mod storage;

#[cfg(test)]
mod testing;

pub use agent::{CassetteAgent, Mode};
pub use error::{ReelError, Result};
pub use headers::HeaderCollection;
