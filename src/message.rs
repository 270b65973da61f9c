//! The message envelope and its wire codec.
//!
//! An envelope is a three-line text header followed by a blank line and an
//! encoded body:
//!
//! ```text
//! {data_type}/{topic}\n{version}\n{encoding}\n\n{body}
//! ```
//!
//! `msgpack` is the only body encoding.

use std::fmt;

use crate::error::{DeserializationError, SerializationError};
use crate::value::{Body, Value};

/// Separates the header from the body.
pub const HEADER_BODY_DELIMITER: &[u8] = b"\n\n";

/// The one supported body encoding.
pub const MSGPACK: &str = "msgpack";

/// A decoded (or to-be-encoded) envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    data_type: String,
    topic: String,
    version: u32,
    encoding: String,
    body: Body,
}

impl Message {
    /// Creates an empty-bodied message at version 0, encoded as msgpack.
    #[must_use]
    pub fn new(data_type: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            topic: topic.into(),
            version: 0,
            encoding: MSGPACK.to_string(),
            body: Body::new(),
        }
    }

    /// Sets the header version.
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the body encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Sets one body field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.body.insert(key, value);
    }

    /// Reads one body field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Wire name of the record type.
    #[must_use]
    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Topic the message was sent on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Header version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Body encoding, normally `msgpack`.
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Body fields in wire order.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// The three header lines, without the trailing delimiter.
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "{}/{}\n{}\n{}",
            self.data_type, self.topic, self.version, self.encoding
        )
    }

    /// The encoded body on its own.
    ///
    /// # Errors
    ///
    /// Returns a `SerializationError` if the encoding is unsupported or the
    /// body cannot be encoded.
    pub fn body_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        encode_body(&self.encoding, &self.body)
    }

    /// The complete envelope.
    ///
    /// # Errors
    ///
    /// See [`Message::body_bytes`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        serialize(
            &self.data_type,
            &self.topic,
            self.version,
            &self.encoding,
            &self.body,
        )
    }

    /// Parses a complete envelope.
    ///
    /// # Errors
    ///
    /// See [`deserialize`].
    pub fn load(bytes: &[u8]) -> Result<Self, DeserializationError> {
        deserialize(bytes)
    }

    /// Parses an envelope whose header and body arrived separately.
    ///
    /// # Errors
    ///
    /// See [`deserialize`].
    pub fn load_split(header: &[u8], body: &[u8]) -> Result<Self, DeserializationError> {
        let mut packet =
            Vec::with_capacity(header.len() + HEADER_BODY_DELIMITER.len() + body.len());
        packet.extend_from_slice(header);
        packet.extend_from_slice(HEADER_BODY_DELIMITER);
        packet.extend_from_slice(body);
        deserialize(&packet)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message[{}/{}][v{} {}]: {}",
            self.data_type, self.topic, self.version, self.encoding, self.body
        )
    }
}

/// Renders a body for inclusion in an error message.
fn render_body(body: &Body) -> String {
    serde_json::to_string(body).unwrap_or_else(|_| body.to_string())
}

fn encode_body(encoding: &str, body: &Body) -> Result<Vec<u8>, SerializationError> {
    if encoding != MSGPACK {
        return Err(SerializationError::UnsupportedEncoding {
            encoding: encoding.to_string(),
        });
    }

    rmp_serde::to_vec(body).map_err(|source| SerializationError::BodyEncoding {
        body: render_body(body),
        source,
    })
}

/// Builds an envelope from its parts.
///
/// # Errors
///
/// Returns `SerializationError::UnsupportedEncoding` for anything but
/// `msgpack`, and `SerializationError::BodyEncoding` if the codec fails.
pub fn serialize(
    data_type: &str,
    topic: &str,
    version: u32,
    encoding: &str,
    body: &Body,
) -> Result<Vec<u8>, SerializationError> {
    let encoded = encode_body(encoding, body)?;
    let header = format!("{data_type}/{topic}\n{version}\n{encoding}");

    let mut packet =
        Vec::with_capacity(header.len() + HEADER_BODY_DELIMITER.len() + encoded.len());
    packet.extend_from_slice(header.as_bytes());
    packet.extend_from_slice(HEADER_BODY_DELIMITER);
    packet.extend_from_slice(&encoded);
    Ok(packet)
}

fn find_delimiter(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEADER_BODY_DELIMITER.len())
        .position(|w| w == HEADER_BODY_DELIMITER)
}

/// Reads leading decimal digits; anything else counts as 0.
fn parse_version(field: &str) -> u32 {
    let digits: String = field.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Parses an envelope.
///
/// # Errors
///
/// - `MissingHeaderBodyDelimiter` if there is no blank line
/// - `BadHeader` if the header is not three lines, has no `/` in the first
///   line, or has an empty data type, version or encoding
/// - `UnsupportedEncoding` for anything but `msgpack`
/// - `BodyDecoding` if the codec rejects the body
/// - `BodyNotHash` if the body decodes to something other than a map
pub fn deserialize(bytes: &[u8]) -> Result<Message, DeserializationError> {
    let Some(split) = find_delimiter(bytes) else {
        return Err(DeserializationError::MissingHeaderBodyDelimiter {
            packet: String::from_utf8_lossy(bytes).into_owned(),
        });
    };
    let header_bytes = &bytes[..split];
    let body_bytes = &bytes[split + HEADER_BODY_DELIMITER.len()..];

    let bad_header = || DeserializationError::BadHeader {
        header: String::from_utf8_lossy(header_bytes).into_owned(),
    };

    let header = std::str::from_utf8(header_bytes).map_err(|_| bad_header())?;
    let fields: Vec<&str> = header.splitn(3, '\n').collect();
    let [address, version, encoding] = fields.as_slice() else {
        return Err(bad_header());
    };
    let Some((data_type, topic)) = address.split_once('/') else {
        return Err(bad_header());
    };
    if data_type.is_empty() || version.is_empty() || encoding.is_empty() {
        return Err(bad_header());
    }

    if *encoding != MSGPACK {
        return Err(DeserializationError::UnsupportedEncoding {
            encoding: (*encoding).to_string(),
        });
    }

    let decoded: Value =
        rmp_serde::from_slice(body_bytes).map_err(|source| DeserializationError::BodyDecoding {
            encoding: (*encoding).to_string(),
            source,
            body: body_bytes.to_vec(),
        })?;

    let body = Body::try_from_value(decoded)
        .map_err(|other| DeserializationError::BodyNotHash {
            body: other.to_string(),
        })?;

    Ok(Message {
        data_type: (*data_type).to_string(),
        topic: (*topic).to_string(),
        version: parse_version(version),
        encoding: (*encoding).to_string(),
        body,
    })
}
