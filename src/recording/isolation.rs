//! Response views that do not share state with the recorded cassette

use http_body_util::{BodyExt, Full};

use crate::network::ClientResponse;
use crate::storage::ResponseRecord;

/// Build a caller-facing response from a stored record
///
/// The header collection is a private copy, so middleware that rewrites headers on the
/// returned response (content decoding, for one) cannot reach the stored record. Status,
/// reason and body are served from the record as-is.
#[must_use]
pub fn isolate(record: &ResponseRecord) -> ClientResponse {
    ClientResponse {
        status: record.status,
        reason: record.reason.clone(),
        headers: record.headers.clone(),
        body: Full::new(record.body.clone())
            .map_err(|never| match never {})
            .boxed(),
    }
}
