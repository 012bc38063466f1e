//! Scripted client shared by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};

use crate::headers::HeaderCollection;
use crate::network::{ClientResponse, HttpClient, OutboundBody};
use crate::{ReelError, Result};

#[derive(Debug, Clone)]
pub(crate) struct SeenRequest {
    pub method: String,
    pub uri: String,
    pub headers: HeaderCollection,
    pub body: Bytes,
}

/// Serves queued responses in order and remembers every request it receives
#[derive(Default)]
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<(u16, String, HeaderCollection, Bytes)>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, reason: &str, headers: &[(&str, &str)], body: &[u8]) -> Self {
        let headers = headers.iter().copied().collect();
        self.responses.lock().unwrap().push_back((
            status,
            reason.to_string(),
            headers,
            Bytes::copy_from_slice(body),
        ));
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl HttpClient for ScriptedClient {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        let body = match body {
            Some(body) => body.collect().await?.to_bytes(),
            None => Bytes::new(),
        };
        self.seen.lock().unwrap().push(SeenRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: headers.clone(),
            body,
        });

        let next = self.responses.lock().unwrap().pop_front();
        let (status, reason, headers, body) =
            next.ok_or_else(|| ReelError::Client(format!("no scripted response for {uri}")))?;

        Ok(ClientResponse {
            status,
            reason,
            headers,
            body: Full::new(body).map_err(|never| match never {}).boxed(),
        })
    }
}
