//! Cassette agent: records real exchanges or replays saved ones

mod replay;

pub use replay::ReplayCursor;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http_body_util::BodyExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::headers::HeaderCollection;
use crate::network::{ClientResponse, HttpClient, OutboundBody};
use crate::recording::{isolate, RecordingBody};
use crate::storage::{
    open_cassette, write_cassette, Cassette, Interaction, LoadOutcome, RequestRecord,
    ResponseRecord,
};
use crate::{ReelError, Result};

/// Operating mode, fixed when the agent is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No cassette existed: real requests are made and captured
    Recording,
    /// A cassette was loaded: requests are served from it in order
    Replaying,
}

impl Mode {
    /// Check if mode is Recording
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, Mode::Recording)
    }

    /// Check if mode is Replaying
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        matches!(self, Mode::Replaying)
    }
}

/// HTTP client that records to, or replays from, a cassette file
///
/// If the cassette file exists it is loaded and every request is answered from it in
/// sequence, without touching the wrapped client. Otherwise requests go to the wrapped
/// client and each completed exchange is appended to an in-memory cassette, which
/// [`save`](Self::save) writes out.
///
/// Recorded interactions are appended in completion order. Replay matching is strictly
/// on method and absolute URI.
pub struct CassetteAgent<C> {
    client: C,
    cassette_path: PathBuf,
    mode: Mode,
    preserve_exact_bytes: bool,
    max_response_size: usize,
    cassette: Mutex<Cassette>,
    cursor: ReplayCursor,
}

impl<C> CassetteAgent<C> {
    /// Create an agent for `cassette_path` with default settings
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette exists but cannot be read or parsed
    pub fn new(client: C, cassette_path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(client, &Config::new(cassette_path))
    }

    /// Create an agent from a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette exists but cannot be read or parsed. A missing
    /// file is not an error; it selects recording mode.
    pub fn from_config(client: C, config: &Config) -> Result<Self> {
        let (mode, cassette) = match open_cassette(&config.cassette_path)? {
            LoadOutcome::Loaded(cassette) => {
                info!(
                    "Replaying {} interactions from {}",
                    cassette.len(),
                    config.cassette_path.display()
                );
                (Mode::Replaying, cassette)
            }
            LoadOutcome::Absent => {
                info!("Recording new cassette at {}", config.cassette_path.display());
                (
                    Mode::Recording,
                    Cassette::with_provenance(config.record.recorded_with.clone()),
                )
            }
        };

        Ok(Self {
            client,
            cassette_path: config.cassette_path.clone(),
            mode,
            preserve_exact_bytes: config.record.preserve_exact_bytes,
            max_response_size: config.limits.max_response_size,
            cassette: Mutex::new(cassette),
            cursor: ReplayCursor::new(),
        })
    }

    /// Mode chosen at construction
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Cassette file location
    #[must_use]
    pub fn cassette_path(&self) -> &Path {
        &self.cassette_path
    }

    /// Copy of the interactions recorded or loaded so far
    #[must_use]
    pub fn cassette(&self) -> Cassette {
        self.store().clone()
    }

    /// Index of the next interaction to replay
    #[must_use]
    pub fn replay_position(&self) -> usize {
        self.cursor.position()
    }

    /// Answer a request from the next saved interaction
    ///
    /// The response is ready immediately; no I/O takes place.
    ///
    /// # Errors
    ///
    /// Returns `CassetteExhausted` if every saved interaction has been used and
    /// `CassetteMismatch` if the next one is for a different method or URI
    pub fn replay_request(&self, method: &str, uri: &str) -> Result<ClientResponse> {
        let cassette = self.store();
        let interaction = self.cursor.advance(&cassette, method, uri)?;
        Ok(isolate(&interaction.response))
    }

    /// Write the recorded cassette, then hand back `passthrough`
    ///
    /// Overwrites any existing file. When replaying this does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a body cannot be encoded or the file cannot be written
    pub fn save<T>(&self, passthrough: T) -> Result<T> {
        if self.mode.is_replaying() {
            return Ok(passthrough);
        }

        let cassette = self.store();
        write_cassette(&self.cassette_path, &cassette, self.preserve_exact_bytes)?;
        info!(
            "Saved {} interactions to {}",
            cassette.len(),
            self.cassette_path.display()
        );
        Ok(passthrough)
    }

    /// Await `future`, then [`save`](Self::save) whatever it produced, success or not
    ///
    /// # Errors
    ///
    /// Returns the save error, if any
    pub async fn save_after<F: Future>(&self, future: F) -> Result<F::Output> {
        let output = future.await;
        self.save(output)
    }

    fn store(&self) -> MutexGuard<'_, Cassette> {
        self.cassette.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: HttpClient> CassetteAgent<C> {
    /// Make a real request and capture the exchange
    async fn record_request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        debug!("Recording {} {}", method, uri);

        let (body, request_capture) = match body {
            Some(source) => {
                let (recording, capture) = RecordingBody::new(source);
                (Some(recording.boxed()), Some(capture))
            }
            None => (None, None),
        };

        let response = self.client.request(method, uri, headers, body).await?;

        let (recording, response_capture) = RecordingBody::new(response.body);
        recording.collect().await?;

        let response_body = response_capture.value()?;
        if response_body.len() > self.max_response_size {
            return Err(ReelError::DataTooLarge {
                size: response_body.len(),
                limit: self.max_response_size,
            });
        }

        // The client may answer without draining the upload; keep what it read.
        let request_body = match request_capture {
            Some(capture) => {
                if !capture.is_complete() {
                    warn!(
                        "{} {} answered after {} request body bytes; recording partial body",
                        method,
                        uri,
                        capture.captured_len()
                    );
                }
                capture.captured()
            }
            None => Bytes::new(),
        };

        let interaction = Interaction::new(
            RequestRecord {
                method: method.to_string(),
                uri: uri.to_string(),
                headers: headers.clone(),
                body: request_body,
            },
            ResponseRecord::new(
                response.status,
                response.reason,
                response.headers,
                response_body,
            ),
        );

        let isolated = isolate(&interaction.response);
        let index = {
            let mut cassette = self.store();
            cassette.append(interaction);
            cassette.len() - 1
        };

        debug!(
            "Recorded interaction {}: {} {} -> {}",
            index, method, uri, isolated.status
        );
        Ok(isolated)
    }
}

impl<C: HttpClient> HttpClient for CassetteAgent<C> {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        headers: &HeaderCollection,
        body: Option<OutboundBody>,
    ) -> Result<ClientResponse> {
        match self.mode {
            Mode::Recording => self.record_request(method, uri, headers, body).await,
            Mode::Replaying => self.replay_request(method, uri),
        }
    }
}
