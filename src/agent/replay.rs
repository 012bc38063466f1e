//! Sequential replay matching

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::storage::{Cassette, Interaction};
use crate::{ReelError, Result};

/// Position of the next interaction to serve
///
/// Advances by one per successful match and never moves backwards. The load and the
/// advance are separate steps, so concurrent replays against one cursor interleave
/// nondeterministically; callers needing a fixed order must issue requests one at a time.
#[derive(Debug, Default)]
pub struct ReplayCursor {
    position: AtomicUsize,
}

impl ReplayCursor {
    /// Cursor at the start of the cassette
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next interaction to serve
    #[must_use]
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Match a request against the next stored interaction and advance past it
    ///
    /// Only the method and absolute URI are compared, by exact string equality.
    /// A failed match leaves the cursor where it was.
    ///
    /// # Errors
    ///
    /// Returns `CassetteExhausted` when every interaction has been served and
    /// `CassetteMismatch` when the next interaction is for a different request
    pub fn advance<'a>(&self, cassette: &'a Cassette, method: &str, uri: &str) -> Result<&'a Interaction> {
        let index = self.position();

        let Some(interaction) = cassette.get(index) else {
            warn!("Cassette exhausted after {index} interactions: {method} {uri}");
            return Err(ReelError::CassetteExhausted {
                method: method.to_string(),
                uri: uri.to_string(),
            });
        };

        let saved = &interaction.request;
        if saved.method != method || saved.uri != uri {
            warn!(
                "Replay mismatch at {index}: {method} {uri} vs saved {} {}",
                saved.method, saved.uri
            );
            return Err(ReelError::CassetteMismatch {
                method: method.to_string(),
                uri: uri.to_string(),
                saved_method: saved.method.clone(),
                saved_uri: saved.uri.clone(),
            });
        }

        self.position.store(index + 1, Ordering::Release);
        debug!("Replayed interaction {index}: {method} {uri}");
        Ok(interaction)
    }
}
