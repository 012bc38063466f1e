//! Cassette storage: document format, body codec and file I/O

mod cassette;
pub mod codec;
mod format;

pub use cassette::{Cassette, Interaction, RequestRecord, ResponseRecord};
pub use format::{
    BodyDocument, CassetteDocument, HeadersDocument, InteractionDocument, RequestDocument,
    ResponseDocument, StatusDocument, HTTP_VERSION, RECORDED_WITH, TEXT_ENCODING,
};

use std::io;
use std::path::Path;

use tracing::debug;

use crate::Result;

/// Outcome of looking for a cassette on disk
#[derive(Debug)]
pub enum LoadOutcome {
    /// No file exists at the path
    Absent,
    /// File was read and parsed
    Loaded(Cassette),
}

/// Read the cassette at `path`
///
/// Only a missing file yields [`LoadOutcome::Absent`].
///
/// # Errors
///
/// Returns `Io` for any other read failure and `MalformedCassette` if the file
/// cannot be parsed
pub fn open_cassette(path: &Path) -> Result<LoadOutcome> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No cassette at {}", path.display());
            return Ok(LoadOutcome::Absent);
        }
        Err(e) => return Err(e.into()),
    };

    let cassette = Cassette::from_json(&text)?;
    debug!(
        "Loaded {} interactions from {}",
        cassette.len(),
        path.display()
    );
    Ok(LoadOutcome::Loaded(cassette))
}

/// Write `cassette` to `path`, replacing any existing file
///
/// # Errors
///
/// Returns an error if a body cannot be encoded or the file cannot be written
pub fn write_cassette(path: &Path, cassette: &Cassette, preserve_exact_bytes: bool) -> Result<()> {
    let json = cassette.to_json(preserve_exact_bytes)?;
    std::fs::write(path, json)?;
    debug!(
        "Wrote {} interactions to {}",
        cassette.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReelError;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = open_cassette(&temp_dir.path().join("none.json")).unwrap();

        assert!(matches!(outcome, LoadOutcome::Absent));
    }

    #[test]
    fn test_directory_is_an_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = open_cassette(temp_dir.path());

        assert!(matches!(result, Err(ReelError::Io(_))));
    }

    #[test]
    fn test_garbage_is_malformed_not_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            open_cassette(&path),
            Err(ReelError::MalformedCassette(_))
        ));
    }

    #[test]
    fn test_write_then_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.json");

        write_cassette(&path, &Cassette::new(), false).unwrap();

        match open_cassette(&path).unwrap() {
            LoadOutcome::Loaded(cassette) => {
                assert!(cassette.is_empty());
                assert_eq!(cassette.recorded_with(), RECORDED_WITH);
            }
            LoadOutcome::Absent => panic!("cassette should exist"),
        }
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("cassette.json");

        assert!(matches!(
            write_cassette(&path, &Cassette::new(), false),
            Err(ReelError::Io(_))
        ));
    }
}
