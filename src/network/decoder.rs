//! Client wrapper that transparently decodes gzip response bodies

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use http_body_util::{BodyExt, Full};
use tracing::debug;

use super::client::{ClientResponse, HttpClient, OutboundBody};
use crate::headers::HeaderCollection;
use crate::{ReelError, Result};

/// Decodes `Content-Encoding: gzip` responses from the wrapped client
///
/// Decoded responses lose their `Content-Encoding` and `Content-Length` headers.
/// Requests without an `Accept-Encoding` header advertise gzip.
pub struct ContentDecoder<C> {
    inner: C,
}

impl<C> ContentDecoder<C> {
    /// Wrap a client
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped client
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: HttpClient> HttpClient for ContentDecoder<C> {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        let mut headers = headers.clone();
        if !headers.contains("Accept-Encoding") {
            headers.append("Accept-Encoding", "gzip");
        }

        let mut response = self.inner.request(method, uri, &headers, body).await?;
        if !is_gzip_only(&response.headers) {
            return Ok(response);
        }

        let compressed = response.body.collect().await?.to_bytes();
        let decoded = gunzip(&compressed)?;
        debug!(
            "Decoded gzip body for {}: {} -> {} bytes",
            uri,
            compressed.len(),
            decoded.len()
        );

        response.headers.remove("Content-Encoding");
        response.headers.remove("Content-Length");
        response.body = Full::new(Bytes::from(decoded))
            .map_err(|never| match never {})
            .boxed();
        Ok(response)
    }
}

/// Whether gzip is the one and only content coding applied
fn is_gzip_only(headers: &HeaderCollection) -> bool {
    let Some(values) = headers.get_raw("Content-Encoding") else {
        return false;
    };
    let mut codings = values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|coding| !coding.is_empty());

    matches!(
        (codings.next(), codings.next()),
        (Some(coding), None) if coding.eq_ignore_ascii_case("gzip")
    )
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|e| ReelError::Client(format!("gzip decoding failed: {e}")))?;
    Ok(decoded)
}
