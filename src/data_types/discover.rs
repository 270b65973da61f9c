use std::fmt;

use regex::Regex;

use super::{string_field, DataType};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::tag::{compile_regex, regex_source};

/// Host name filter of a discovery probe.
///
/// A `/.../` string becomes a case-insensitive, extended-mode pattern;
/// anything else is a literal, and the empty literal matches every host.
#[derive(Debug, Clone)]
pub enum HostFilter {
    /// Exact host name, or empty for any host.
    Literal(String),
    /// Regular expression searched in the host name.
    Pattern {
        /// Text between the slashes.
        source: String,
        /// Compiled form of `source`.
        regex: Regex,
    },
}

impl HostFilter {
    /// Parses a filter string.
    ///
    /// # Errors
    ///
    /// Returns the regex error if a `/.../` filter does not compile.
    pub fn parse(value: &str) -> Result<Self, regex::Error> {
        match regex_source(value) {
            Some(source) => Ok(Self::Pattern {
                source: source.to_string(),
                regex: compile_regex(source)?,
            }),
            None => Ok(Self::Literal(value.to_string())),
        }
    }

    /// True for the empty literal.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Literal(s) if s.is_empty())
    }

    /// True if `host_name` passes this filter.
    #[must_use]
    pub fn matches(&self, host_name: &str) -> bool {
        match self {
            Self::Literal(literal) => literal.is_empty() || literal == host_name,
            Self::Pattern { regex, .. } => regex.is_match(host_name),
        }
    }
}

impl Default for HostFilter {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

impl PartialEq for HostFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern { source: a, .. }, Self::Pattern { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HostFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Pattern { source, .. } => write!(f, "/{source}/"),
        }
    }
}

/// Discovery probe: "is there a `program` running on `host_name`?"
///
/// Empty fields match anything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discover {
    /// Which hosts should answer.
    pub host_name: HostFilter,
    /// Which program should answer; empty for any.
    pub program: String,
}

impl Discover {
    /// Builds a probe from filter strings.
    ///
    /// # Errors
    ///
    /// Returns `DataTypeError::InvalidField` if `host_name` is a `/.../`
    /// pattern that does not compile.
    pub fn new(host_name: &str, program: impl Into<String>) -> Result<Self, DataTypeError> {
        let host_name = HostFilter::parse(host_name).map_err(|e| DataTypeError::InvalidField {
            data_type: Self::NAME,
            field: "host_name",
            reason: e.to_string(),
        })?;
        Ok(Self {
            host_name,
            program: program.into(),
        })
    }

    /// Probe answered by every responder.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// True if a node with this identity should answer.
    #[must_use]
    pub fn matches(&self, host_name: &str, program: &str) -> bool {
        self.host_name.matches(host_name) && (self.program.is_empty() || self.program == program)
    }
}

impl DataType for Discover {
    const NAME: &'static str = "Discover";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        Self::new(
            &string_field(message, Self::NAME, "host_name")?,
            string_field(message, Self::NAME, "program")?,
        )
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("host_name", self.host_name.to_string());
        message.insert("program", self.program.as_str());
        message
    }
}

impl fmt::Display for Discover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discover[{}/{}]", self.host_name, self.program)
    }
}
