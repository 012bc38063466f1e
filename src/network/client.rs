//! HTTP client interface and its hyper-backed implementation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::ext::ReasonPhrase;
use hyper::{Method, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::{POOL_IDLE_TIMEOUT_SECS, POOL_MAX_IDLE_PER_HOST};
use crate::headers::HeaderCollection;
use crate::{ReelError, Result};

/// Streamed request body handed to a client
pub type OutboundBody = BoxBody<Bytes, ReelError>;

/// Streamed response body delivered by a client
pub type ResponseBody = BoxBody<Bytes, ReelError>;

/// Response returned by an [`HttpClient`]
pub struct ClientResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub reason: String,
    /// Response headers
    pub headers: HeaderCollection,
    /// Response body, delivered as it is polled
    pub body: ResponseBody,
}

impl ClientResponse {
    /// Read the body to completion
    ///
    /// # Errors
    ///
    /// Returns the body stream's error if delivery fails
    pub async fn into_bytes(self) -> Result<Bytes> {
        Ok(self.body.collect().await?.to_bytes())
    }
}

impl std::fmt::Debug for ClientResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Something that performs HTTP requests
///
/// The cassette agent and the client wrappers all implement this, so they can be
/// stacked and substituted for one another at the call site.
pub trait HttpClient: Send + Sync {
    /// Issue a request to an absolute `uri`
    fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> impl Future<Output = Result<ClientResponse>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> impl Future<Output = Result<ClientResponse>> + Send {
        self.as_ref().request(method, uri, headers, body)
    }
}

/// HTTP and HTTPS client over hyper's pooled connector
///
/// TLS uses rustls with the bundled webpki root certificates.
pub struct HyperClient {
    client: Client<HttpsConnector<HttpConnector>, OutboundBody>,
}

impl HyperClient {
    /// Create a new HTTP client
    #[must_use]
    pub fn new() -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build(connector);

        Self { client }
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HyperClient {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        let request = build_request(method, uri, headers, body)?;

        debug!("Sending {} {}", method, uri);

        let response = self.client.request(request).await.map_err(|e| {
            warn!("Request failed: {e}");
            ReelError::Client(format!("{method} {uri}: {e}"))
        })?;

        let status = response.status();
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_default();

        let headers: HeaderCollection = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .into_body()
            .map_err(|e| ReelError::Client(format!("failed to read response body: {e}")))
            .boxed();

        Ok(ClientResponse {
            status: status.as_u16(),
            reason,
            headers,
            body,
        })
    }
}

/// Build a hyper request from its parts
fn build_request(
    method: &str,
    uri: &str,
    headers: &HeaderCollection,
    body: Option<OutboundBody>,
) -> Result<Request<OutboundBody>> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|e| ReelError::InvalidRequest(format!("invalid HTTP method '{method}': {e}")))?;

    let uri = uri
        .parse::<Uri>()
        .map_err(|e| ReelError::InvalidRequest(format!("invalid URI '{uri}': {e}")))?;

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, values) in headers.iter() {
        for value in values {
            builder = builder.header(name, value.as_str());
        }
    }

    let body = body.unwrap_or_else(|| Empty::new().map_err(|never| match never {}).boxed());

    builder
        .body(body)
        .map_err(|e| ReelError::InvalidRequest(format!("failed to build request: {e}")))
}
