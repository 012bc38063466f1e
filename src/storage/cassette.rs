//! In-memory cassette: an ordered store of recorded interactions

use bytes::Bytes;
use chrono::Utc;
use hyper::Uri;

use super::codec::{decode_body, encode_body, headers_to_map, map_to_headers};
use super::format::{
    CassetteDocument, InteractionDocument, RequestDocument, ResponseDocument, StatusDocument,
    HTTP_VERSION, RECORDED_WITH,
};
use crate::headers::HeaderCollection;
use crate::{ReelError, Result};

const CONTENT_LENGTH: &str = "Content-Length";

/// A recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// HTTP method, e.g. `GET`
    pub method: String,
    /// Absolute URI including scheme and authority
    pub uri: String,
    /// Request headers as sent
    pub headers: HeaderCollection,
    /// Request body, empty when none was sent
    pub body: Bytes,
}

impl RequestRecord {
    /// Path and query of the URI, as carried on a request line
    #[must_use]
    pub fn relative_uri(&self) -> String {
        match self.uri.parse::<Uri>() {
            Ok(uri) => uri
                .path_and_query()
                .map_or_else(|| "/".to_string(), ToString::to_string),
            Err(_) => self.uri.clone(),
        }
    }
}

/// A recorded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub reason: String,
    /// Response headers as received
    pub headers: HeaderCollection,
    /// Full response body
    pub body: Bytes,
    /// Length declared by the `Content-Length` header, if any
    pub content_length: Option<u64>,
}

impl ResponseRecord {
    /// Build a record, taking the declared length from the headers
    #[must_use]
    pub fn new(status: u16, reason: impl Into<String>, headers: HeaderCollection, body: Bytes) -> Self {
        let content_length = declared_length(&headers);
        Self {
            status,
            reason: reason.into(),
            headers,
            body,
            content_length,
        }
    }

    /// Protocol version; HTTP/1.1 is the only one recorded
    #[must_use]
    pub fn http_version(&self) -> &'static str {
        HTTP_VERSION
    }
}

/// A request paired with its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// Request half
    pub request: RequestRecord,
    /// Response half
    pub response: ResponseRecord,
    /// RFC 2822 timestamp, informational only
    pub recorded_at: String,
}

impl Interaction {
    /// Pair a request and response, stamped with the current time
    #[must_use]
    pub fn new(request: RequestRecord, response: ResponseRecord) -> Self {
        Self {
            request,
            response,
            recorded_at: Utc::now().to_rfc2822(),
        }
    }
}

/// Ordered sequence of interactions
///
/// Order is recording order or file order; entries are never reordered, deduplicated,
/// or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cassette {
    interactions: Vec<Interaction>,
    recorded_with: String,
}

impl Default for Cassette {
    fn default() -> Self {
        Self::new()
    }
}

impl Cassette {
    /// Create an empty cassette stamped with this crate's provenance
    #[must_use]
    pub fn new() -> Self {
        Self::with_provenance(RECORDED_WITH)
    }

    /// Create an empty cassette stamped with the given provenance string
    #[must_use]
    pub fn with_provenance(recorded_with: impl Into<String>) -> Self {
        Self {
            interactions: Vec::new(),
            recorded_with: recorded_with.into(),
        }
    }

    /// Rebuild a cassette from its document form
    ///
    /// # Errors
    ///
    /// Returns `MalformedCassette` if a body or protocol version cannot be understood
    pub fn load(document: CassetteDocument) -> Result<Self> {
        let interactions = document
            .http_interactions
            .into_iter()
            .enumerate()
            .map(|(index, interaction)| {
                load_interaction(interaction).map_err(|e| match e {
                    ReelError::MalformedCassette(reason) => {
                        ReelError::MalformedCassette(format!("interaction {index}: {reason}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            interactions,
            recorded_with: document.recorded_with,
        })
    }

    /// Parse a cassette from JSON text
    ///
    /// # Errors
    ///
    /// Returns `MalformedCassette` if the text is not a valid cassette
    pub fn from_json(text: &str) -> Result<Self> {
        Self::load(serde_json::from_str(text)?)
    }

    /// Produce the document form, interactions in stored order
    ///
    /// With `preserve_exact_bytes` every body is base64-encoded.
    ///
    /// # Errors
    ///
    /// Returns `UnencodableBody` if a body stored as text is not valid UTF-8
    pub fn serialize(&self, preserve_exact_bytes: bool) -> Result<CassetteDocument> {
        let http_interactions = self
            .interactions
            .iter()
            .map(|interaction| serialize_interaction(interaction, preserve_exact_bytes))
            .collect::<Result<Vec<_>>>()?;

        Ok(CassetteDocument {
            http_interactions,
            recorded_with: self.recorded_with.clone(),
        })
    }

    /// Serialize to pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if a body cannot be encoded
    pub fn to_json(&self, preserve_exact_bytes: bool) -> Result<String> {
        Ok(serde_json::to_string_pretty(
            &self.serialize(preserve_exact_bytes)?,
        )?)
    }

    /// Append an interaction
    pub fn append(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    /// Interaction at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Interaction> {
        self.interactions.get(index)
    }

    /// Number of interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether there are no interactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Iterate in stored order
    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    /// Provenance string
    #[must_use]
    pub fn recorded_with(&self) -> &str {
        &self.recorded_with
    }
}

fn load_interaction(document: InteractionDocument) -> Result<Interaction> {
    let InteractionDocument {
        request,
        response,
        recorded_at,
    } = document;

    if let Some(version) = response.http_version.as_deref() {
        if version != HTTP_VERSION {
            return Err(ReelError::MalformedCassette(format!(
                "unsupported HTTP version `{version}`"
            )));
        }
    }

    let request = RequestRecord {
        body: decode_body(&request.body)?,
        method: request.method,
        uri: request.uri,
        headers: map_to_headers(request.headers),
    };

    let body = decode_body(&response.body)?;
    let response = ResponseRecord::new(
        response.status.code,
        response.status.message,
        map_to_headers(response.headers),
        body,
    );

    Ok(Interaction {
        request,
        response,
        recorded_at,
    })
}

fn serialize_interaction(
    interaction: &Interaction,
    preserve_exact_bytes: bool,
) -> Result<InteractionDocument> {
    let request = &interaction.request;
    let response = &interaction.response;

    let mut response_headers = response.headers.clone();
    match response.content_length {
        // The declared length describes a body the server never sends
        Some(_) if never_has_body(&request.method, response.status) => {}
        Some(_) => response_headers.set_raw(
            existing_name(&response_headers, CONTENT_LENGTH),
            vec![response.body.len().to_string()],
        ),
        None => {
            response_headers.remove(CONTENT_LENGTH);
        }
    }

    Ok(InteractionDocument {
        request: RequestDocument {
            method: request.method.clone(),
            uri: request.uri.clone(),
            headers: headers_to_map(&request.headers),
            body: encode_body(&request.body, Some(&request.headers), preserve_exact_bytes)?,
        },
        response: ResponseDocument {
            http_version: Some(HTTP_VERSION.to_string()),
            status: StatusDocument {
                code: response.status,
                message: response.reason.clone(),
            },
            headers: headers_to_map(&response_headers),
            body: encode_body(&response.body, Some(&response.headers), preserve_exact_bytes)?,
        },
        recorded_at: interaction.recorded_at.clone(),
    })
}

fn never_has_body(method: &str, status: u16) -> bool {
    method.eq_ignore_ascii_case("HEAD") || matches!(status, 100..=199 | 204 | 304)
}

fn declared_length(headers: &HeaderCollection) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.trim().parse().ok())
}

fn existing_name(headers: &HeaderCollection, name: &str) -> String {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |(existing, _)| existing.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROOM208: &str = r#"{
        "http_interactions": [
            {
                "request": {
                    "method": "GET",
                    "uri": "http://room208.org/",
                    "headers": {},
                    "body": {"encoding": "utf-8", "string": ""}
                },
                "response": {
                    "http_version": "1.1",
                    "status": {"code": 301, "message": "Moved Permanently"},
                    "headers": {"Location": ["https://room208.org/"], "Content-Length": ["0"]},
                    "body": {"encoding": "utf-8", "string": ""}
                },
                "recorded_at": "Mon, 06 Jul 2015 01:48:05 GMT"
            },
            {
                "request": {
                    "method": "GET",
                    "uri": "https://room208.org/",
                    "headers": {},
                    "body": {"encoding": "utf-8", "string": ""}
                },
                "response": {
                    "http_version": "1.1",
                    "status": {"code": 200, "message": "OK"},
                    "headers": {"Content-Encoding": ["gzip"]},
                    "body": {"encoding": "utf-8", "base64_string": "H4sIAAAAAAAA/w=="}
                },
                "recorded_at": "Mon, 06 Jul 2015 01:48:05 GMT"
            }
        ],
        "recorded_with": "vcr-tool 0.9"
    }"#;

    fn sample_interaction(uri: &str, body: &'static [u8], headers: HeaderCollection) -> Interaction {
        Interaction::new(
            RequestRecord {
                method: "GET".to_string(),
                uri: uri.to_string(),
                headers: [("Host", "example.test")].into_iter().collect(),
                body: Bytes::new(),
            },
            ResponseRecord::new(200, "OK", headers, Bytes::from_static(body)),
        )
    }

    #[test]
    fn test_load_room208() {
        let cassette = Cassette::from_json(ROOM208).unwrap();

        assert_eq!(cassette.len(), 2);
        assert_eq!(cassette.recorded_with(), "vcr-tool 0.9");

        let first = cassette.get(0).unwrap();
        assert_eq!(first.request.method, "GET");
        assert_eq!(first.request.uri, "http://room208.org/");
        assert_eq!(first.response.status, 301);
        assert_eq!(first.response.reason, "Moved Permanently");
        assert_eq!(first.response.content_length, Some(0));

        let second = cassette.get(1).unwrap();
        assert_eq!(second.request.uri, "https://room208.org/");
        assert_eq!(second.response.status, 200);
        assert_eq!(second.response.reason, "OK");
        assert_eq!(second.response.body.len(), 10);
    }

    #[test]
    fn test_load_missing_field_is_malformed() {
        let result = Cassette::from_json(r#"{"recorded_with": "x"}"#);
        assert!(matches!(result, Err(ReelError::MalformedCassette(_))));
    }

    #[test]
    fn test_load_bad_body_names_interaction() {
        let broken = ROOM208.replacen(r#""H4sIAAAAAAAA/w==""#, r#""***""#, 1);
        let err = Cassette::from_json(&broken).unwrap_err();

        match err {
            ReelError::MalformedCassette(reason) => assert!(reason.contains("interaction 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_other_http_versions() {
        let http2 = ROOM208.replacen(r#""http_version": "1.1""#, r#""http_version": "2""#, 1);
        assert!(matches!(
            Cassette::from_json(&http2),
            Err(ReelError::MalformedCassette(_))
        ));
    }

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut cassette = Cassette::new();
        cassette.append(sample_interaction("http://a.test/", b"1", HeaderCollection::new()));
        cassette.append(sample_interaction("http://b.test/", b"2", HeaderCollection::new()));
        cassette.append(sample_interaction("http://a.test/", b"1", HeaderCollection::new()));

        let uris: Vec<_> = cassette.iter().map(|i| i.request.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://a.test/", "http://b.test/", "http://a.test/"]);
    }

    #[test]
    fn test_round_trip_text_and_gzip() {
        let mut cassette = Cassette::new();
        cassette.append(sample_interaction(
            "http://example.test/",
            b"hello",
            [("Content-Type", "text/plain")].into_iter().collect(),
        ));
        cassette.append(sample_interaction(
            "http://example.test/gz",
            &[0x1f, 0x8b, 0x08, 0x00, 0xff, 0x00],
            [("Content-Encoding", "gzip")].into_iter().collect(),
        ));
        cassette.append(sample_interaction("http://example.test/empty", b"", HeaderCollection::new()));

        let json = cassette.to_json(false).unwrap();
        let restored = Cassette::from_json(&json).unwrap();
        assert_eq!(restored, cassette);
    }

    #[test]
    fn test_content_length_rewritten_from_body() {
        let mut cassette = Cassette::new();
        cassette.append(sample_interaction(
            "http://example.test/",
            b"hello",
            [("content-length", "999")].into_iter().collect(),
        ));

        let document = cassette.serialize(false).unwrap();
        let headers = &document.http_interactions[0].response.headers.0;
        assert_eq!(headers[0], ("content-length".to_string(), vec!["5".to_string()]));
    }

    #[test]
    fn test_bodiless_responses_keep_declared_length() {
        let mut head = sample_interaction(
            "http://example.test/",
            b"",
            [("Content-Length", "1234")].into_iter().collect(),
        );
        head.request.method = "HEAD".to_string();
        let not_modified = Interaction::new(
            sample_interaction("http://example.test/", b"", HeaderCollection::new()).request,
            ResponseRecord::new(
                304,
                "Not Modified",
                [("Content-Length", "1234")].into_iter().collect(),
                Bytes::new(),
            ),
        );

        let mut cassette = Cassette::new();
        cassette.append(head);
        cassette.append(not_modified);
        let restored = Cassette::from_json(&cassette.to_json(false).unwrap()).unwrap();

        for interaction in restored.iter() {
            assert_eq!(interaction.response.headers.get("Content-Length"), Some("1234"));
            assert_eq!(interaction.response.content_length, Some(1234));
        }
    }

    #[test]
    fn test_unknown_length_omits_header() {
        let mut interaction = sample_interaction(
            "http://example.test/",
            b"hello",
            [("Content-Length", "chunked?")].into_iter().collect(),
        );
        assert_eq!(interaction.response.content_length, None);
        interaction.response.headers.append("X-Trace", "1");

        let mut cassette = Cassette::new();
        cassette.append(interaction);
        let document = cassette.serialize(false).unwrap();
        let headers = &document.http_interactions[0].response.headers.0;
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, "X-Trace");
    }

    #[test]
    fn test_preserve_exact_bytes_forces_base64() {
        let mut cassette = Cassette::new();
        cassette.append(sample_interaction("http://example.test/", b"hello", HeaderCollection::new()));

        let document = cassette.serialize(true).unwrap();
        let interaction = &document.http_interactions[0];
        assert!(interaction.request.body.base64_string.is_some());
        assert_eq!(interaction.response.body.base64_string.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_relative_uri() {
        let interaction = sample_interaction("https://room208.org/a/b?c=d", b"", HeaderCollection::new());
        assert_eq!(interaction.request.relative_uri(), "/a/b?c=d");
    }

    proptest! {
        #[test]
        fn prop_exact_bytes_round_trip(
            request_body in proptest::collection::vec(any::<u8>(), 0..128),
            response_body in proptest::collection::vec(any::<u8>(), 0..256),
            status in 100u16..600,
        ) {
            let mut cassette = Cassette::new();
            cassette.append(Interaction::new(
                RequestRecord {
                    method: "POST".to_string(),
                    uri: "http://example.test/upload".to_string(),
                    headers: HeaderCollection::new(),
                    body: Bytes::from(request_body),
                },
                ResponseRecord::new(status, "Whatever", HeaderCollection::new(), Bytes::from(response_body)),
            ));

            let restored = Cassette::from_json(&cassette.to_json(true).unwrap()).unwrap();
            prop_assert_eq!(restored, cassette);
        }
    }
}
