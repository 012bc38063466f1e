//! Client wrapper that follows HTTP redirects

use tracing::debug;
use url::Url;

use super::client::{ClientResponse, HttpClient, OutboundBody};
use crate::headers::HeaderCollection;
use crate::{ReelError, Result};

/// Follows 301, 302, 303, 307 and 308 responses from the wrapped client
///
/// Every hop goes through the wrapped client. 303 responses, and 301/302 responses to
/// anything other than GET or HEAD, are followed with a bodiless GET. A 307/308 to a
/// request that carried a body is returned unfollowed, since the body is already spent.
pub struct RedirectFollower<C> {
    inner: C,
    max_redirects: usize,
}

impl<C> RedirectFollower<C> {
    /// Wrap a client, following at most `max_redirects` hops per request
    pub fn new(inner: C, max_redirects: usize) -> Self {
        Self {
            inner,
            max_redirects,
        }
    }

    /// The wrapped client
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: HttpClient> HttpClient for RedirectFollower<C> {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        let mut method = method.to_string();
        let mut uri = uri.to_string();
        let mut body = body;

        for _ in 0..=self.max_redirects {
            let sent_body = body.is_some();
            let response = self.inner.request(&method, &uri, headers, body.take()).await?;

            let Some(location) = redirect_target(&response) else {
                return Ok(response);
            };

            match response.status {
                303 if method != "HEAD" => method = "GET".to_string(),
                301 | 302 if method != "GET" && method != "HEAD" => method = "GET".to_string(),
                307 | 308 if sent_body => return Ok(response),
                _ => {}
            }

            let next = resolve_location(&uri, location)?;
            debug!("Following {} redirect: {} -> {}", response.status, uri, next);
            uri = next;
        }

        Err(ReelError::Client(format!(
            "too many redirects (more than {}) starting from {uri}",
            self.max_redirects
        )))
    }
}

fn redirect_target(response: &ClientResponse) -> Option<&str> {
    if matches!(response.status, 301 | 302 | 303 | 307 | 308) {
        response.headers.get("Location")
    } else {
        None
    }
}

/// Resolve a `Location` value against the URI that produced it
fn resolve_location(base: &str, location: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| {
        ReelError::InvalidRequest(format!("cannot resolve redirect against '{base}': {e}"))
    })?;
    let next = base
        .join(location.trim())
        .map_err(|e| ReelError::Client(format!("invalid redirect location '{location}': {e}")))?;
    Ok(next.into())
}
