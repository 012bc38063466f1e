//! On-disk cassette document
//!
//! ```text
//! {
//!   "http_interactions": [
//!     {
//!       "request":  { "method", "uri", "headers", "body" },
//!       "response": { "http_version", "status": { "code", "message" }, "headers", "body" },
//!       "recorded_at": "<RFC 2822 date>"
//!     }
//!   ],
//!   "recorded_with": "<tool> <version>"
//! }
//! ```
//!
//! Bodies are either `{"encoding": "utf-8", "string": ...}` or `{"base64_string": ...}`.
//! Headers map each field name to its list of raw values, in recorded order.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire protocol version written for every response
pub const HTTP_VERSION: &str = "1.1";

/// Text encoding tag written for plain-string bodies
pub const TEXT_ENCODING: &str = "utf-8";

/// Provenance string written by this crate
pub const RECORDED_WITH: &str = concat!("reel ", env!("CARGO_PKG_VERSION"));

/// Top-level cassette document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CassetteDocument {
    /// Interactions in recorded order
    pub http_interactions: Vec<InteractionDocument>,
    /// Tool name and version that produced the file
    pub recorded_with: String,
}

/// One request/response exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionDocument {
    /// Recorded request
    pub request: RequestDocument,
    /// Recorded response
    pub response: ResponseDocument,
    /// RFC 2822 timestamp
    pub recorded_at: String,
}

/// Recorded request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDocument {
    /// HTTP method
    pub method: String,
    /// Absolute URI
    pub uri: String,
    /// Request headers
    pub headers: HeadersDocument,
    /// Request body
    pub body: BodyDocument,
}

/// Recorded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDocument {
    /// Protocol version, always [`HTTP_VERSION`] when written
    #[serde(default)]
    pub http_version: Option<String>,
    /// Status line
    pub status: StatusDocument,
    /// Response headers
    pub headers: HeadersDocument,
    /// Response body
    pub body: BodyDocument,
}

/// Status code and reason phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDocument {
    /// Status code
    pub code: u16,
    /// Reason phrase
    pub message: String,
}

/// Body in either text or base64 form
///
/// Exactly one of `string` and `base64_string` is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyDocument {
    /// Text encoding of `string`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Plain text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    /// Base64 body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_string: Option<String>,
}

/// Header mapping that keeps field order through serde
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadersDocument(pub Vec<(String, Vec<String>)>);

impl Serialize for HeadersDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeadersDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = HeadersDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to lists of string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    fields.push((name, values));
                }
                Ok(HeadersDocument(fields))
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}
