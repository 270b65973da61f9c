//! Error types for the message bus.
//!
//! All errors are strongly typed using thiserror so callers can tell a
//! malformed envelope from an unknown data type, a discovery timeout from a
//! transport failure, and so on.

use thiserror::Error;

/// Errors raised while turning a message into bytes.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The body codec failed.
    #[error("failed to encode message body: {body}: {source}")]
    BodyEncoding {
        /// Rendering of the offending body.
        body: String,
        /// Underlying codec error.
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// The envelope names an encoding other than msgpack.
    #[error("don't know how to encode message body in: {encoding}")]
    UnsupportedEncoding {
        /// Encoding named in the envelope.
        encoding: String,
    },
}

/// Errors raised while parsing an envelope.
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// No blank line separates header from body.
    #[error("missing header body delimiter: {packet:?}")]
    MissingHeaderBodyDelimiter {
        /// Lossy rendering of the frame.
        packet: String,
    },

    /// The header has the wrong shape.
    #[error("failed to parse header: {header:?}")]
    BadHeader {
        /// Header text as received.
        header: String,
    },

    /// The header names an encoding other than msgpack.
    #[error("don't know how to decode message encoded in: {encoding}")]
    UnsupportedEncoding {
        /// Encoding named in the header.
        encoding: String,
    },

    /// The body bytes are not valid msgpack.
    #[error("failed to decode body encoded with '{encoding}': {source}: {body:?}")]
    BodyDecoding {
        /// Encoding named in the header.
        encoding: String,
        /// Underlying codec error.
        #[source]
        source: rmp_serde::decode::Error,
        /// Body bytes as received.
        body: Vec<u8>,
    },

    /// The body decoded to something other than a map.
    #[error("expected body to be a map, got: {body}")]
    BodyNotHash {
        /// Rendering of the decoded body.
        body: String,
    },
}

/// Errors raised by the data type registry and record constructors.
#[derive(Debug, Error)]
pub enum DataTypeError {
    /// No record type is registered under this name.
    #[error("unknown data type: {name}")]
    UnknownDataType {
        /// Wire name from the header.
        name: String,
    },

    /// A required body field is absent.
    #[error("data type '{data_type}' is missing required field '{field}'")]
    MissingField {
        /// Record type being built.
        data_type: &'static str,
        /// Absent field.
        field: &'static str,
    },

    /// A body field has the wrong type or an unparsable value.
    #[error("data type '{data_type}' field '{field}' has invalid value: {reason}")]
    InvalidField {
        /// Record type being built.
        data_type: &'static str,
        /// Offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Another type already owns this wire name.
    #[error("data type name '{name}' is already registered to a different type")]
    NameClash {
        /// Contested wire name.
        name: &'static str,
    },
}

/// Errors raised while parsing tag patterns.
#[derive(Debug, Error)]
pub enum TagError {
    /// A `/.../` component is not a valid regex.
    #[error("invalid regular expression in tag component '{component}': {source}")]
    InvalidRegex {
        /// Component text between the slashes.
        component: String,
        /// Regex compiler error.
        #[source]
        source: regex::Error,
    },
}

/// Errors surfaced by the transport collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The other end is gone.
    #[error("transport channel closed")]
    Closed,

    /// The channel refused a frame.
    #[error("transport rejected frame: {reason}")]
    Rejected {
        /// Why it was refused.
        reason: String,
    },
}

/// Errors raised by bus discovery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No `Hello` arrived before the deadline.
    #[error("no discovery response received")]
    NoBus {
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },
}

/// Top-level error type for the message bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// Encoding an envelope failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Parsing an envelope failed.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] DeserializationError),

    /// Building or registering a record failed.
    #[error("data type error: {0}")]
    DataType(#[from] DataTypeError),

    /// A tag pattern did not parse.
    #[error("tag error: {0}")]
    Tag(#[from] TagError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Discovery failed.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

impl BusError {
    /// Returns true if this is a malformed envelope.
    #[must_use]
    pub const fn is_deserialization(&self) -> bool {
        matches!(self, Self::Deserialization(_))
    }

    /// Returns true if the envelope named a data type nobody registered.
    #[must_use]
    pub const fn is_unknown_data_type(&self) -> bool {
        matches!(self, Self::DataType(DataTypeError::UnknownDataType { .. }))
    }

    /// Returns true if this is a discovery timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Discovery(DiscoveryError::NoBus { .. }))
    }

    /// Returns true if the poll loop may log this error and carry on.
    ///
    /// Decode and conversion failures only cost the one message; transport,
    /// discovery and configuration failures must reach the caller.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Deserialization(_) | Self::DataType(_) => true,
            Self::Serialization(_) | Self::Tag(_) | Self::Transport(_) | Self::Discovery(_) => {
                false
            }
        }
    }
}

/// Result type alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;
