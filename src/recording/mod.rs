//! Capturing bodies as they are delivered, and isolating what callers receive

mod interceptor;
mod isolation;

pub use interceptor::{BodyCapture, RecordingBody};
pub use isolation::isolate;
