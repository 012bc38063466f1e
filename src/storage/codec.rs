//! Body and header conversion between memory and the cassette document

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

use super::format::{BodyDocument, HeadersDocument, TEXT_ENCODING};
use crate::headers::HeaderCollection;
use crate::{ReelError, Result};

/// Decode a stored body back into its exact bytes
///
/// # Errors
///
/// Returns `MalformedCassette` if the body has neither a `base64_string` nor a `string`,
/// if the base64 is invalid, or if the text encoding is not UTF-8
pub fn decode_body(body: &BodyDocument) -> Result<Bytes> {
    if let Some(encoded) = &body.base64_string {
        // Line-wrapped base64 is common in cassettes written by other tools
        let encoded: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        return STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(|e| ReelError::MalformedCassette(format!("invalid base64 body: {e}")));
    }

    let Some(text) = &body.string else {
        return Err(ReelError::MalformedCassette(
            "body has neither `string` nor `base64_string`".to_string(),
        ));
    };

    match body.encoding.as_deref() {
        Some(encoding) if is_utf8_label(encoding) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        Some(encoding) => Err(ReelError::MalformedCassette(format!(
            "unsupported body encoding `{encoding}`"
        ))),
        None => Err(ReelError::MalformedCassette(
            "text body is missing its `encoding`".to_string(),
        )),
    }
}

/// Encode body bytes into their stored form
///
/// Base64 is chosen when `force_binary` is set or `headers` declare a gzip
/// `Content-Encoding`; every other body is stored as UTF-8 text. The bytes themselves
/// never influence the choice.
///
/// # Errors
///
/// Returns `UnencodableBody` if text form was chosen and the bytes are not valid UTF-8
pub fn encode_body(
    body: &[u8],
    headers: Option<&HeaderCollection>,
    force_binary: bool,
) -> Result<BodyDocument> {
    if force_binary || headers.is_some_and(declares_gzip) {
        return Ok(BodyDocument {
            encoding: None,
            string: None,
            base64_string: Some(STANDARD.encode(body)),
        });
    }

    let text = std::str::from_utf8(body).map_err(|e| {
        ReelError::UnencodableBody(format!(
            "{e}; enable preserve_exact_bytes to store binary bodies"
        ))
    })?;

    Ok(BodyDocument {
        encoding: Some(TEXT_ENCODING.to_string()),
        string: Some(text.to_string()),
        base64_string: None,
    })
}

/// Convert a header collection into its stored mapping
#[must_use]
pub fn headers_to_map(headers: &HeaderCollection) -> HeadersDocument {
    HeadersDocument(
        headers
            .iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect(),
    )
}

/// Convert a stored mapping back into a header collection
#[must_use]
pub fn map_to_headers(map: HeadersDocument) -> HeaderCollection {
    let mut headers = HeaderCollection::new();
    for (name, values) in map.0 {
        match headers.get_raw(&name) {
            Some(existing) => {
                let mut merged = existing.to_vec();
                merged.extend(values);
                headers.set_raw(name, merged);
            }
            None => headers.set_raw(name, values),
        }
    }
    headers
}

fn declares_gzip(headers: &HeaderCollection) -> bool {
    headers.has_token("content-encoding", "gzip")
}

fn is_utf8_label(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}
