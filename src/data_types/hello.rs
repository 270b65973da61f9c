use std::fmt;

use super::{int_field, invalid, string_field, DataType};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::value::Value;

/// Answer to a [`Discover`](super::Discover) probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hello {
    /// Host the responder runs on.
    pub host_name: String,
    /// Program name of the responder.
    pub program: String,
    /// Process id of the responder.
    pub pid: u32,
}

impl Hello {
    /// Builds a reply.
    #[must_use]
    pub fn new(host_name: impl Into<String>, program: impl Into<String>, pid: u32) -> Self {
        Self {
            host_name: host_name.into(),
            program: program.into(),
            pid,
        }
    }
}

impl DataType for Hello {
    const NAME: &'static str = "Hello";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        let pid = int_field(message, Self::NAME, "pid")?;
        let pid = u32::try_from(pid)
            .map_err(|_| invalid(Self::NAME, "pid", "process id", &Value::Int(pid)))?;
        Ok(Self {
            host_name: string_field(message, Self::NAME, "host_name")?,
            program: string_field(message, Self::NAME, "program")?,
            pid,
        })
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("host_name", self.host_name.as_str());
        message.insert("program", self.program.as_str());
        message.insert("pid", self.pid);
        message
    }
}

impl fmt::Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hello[{}/{}:{}]", self.host_name, self.program, self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let message = Hello::new("magi", "data-processor", 42).to_message("abc");
        assert_eq!(message.data_type(), "Hello");
        assert_eq!(message.topic(), "abc");
        assert_eq!(message.get("host_name"), Some(&Value::from("magi")));
        assert_eq!(message.get("program"), Some(&Value::from("data-processor")));
        assert_eq!(message.get("pid"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_from_message() {
        let hello = Hello::new("magi", "data-processor", 42);
        assert_eq!(Hello::from_message(&hello.to_message("")).unwrap(), hello);
    }

    #[test]
    fn test_negative_pid_is_invalid() {
        let mut message = Hello::new("magi", "p", 1).to_message("");
        message.insert("pid", -1);
        assert!(matches!(
            Hello::from_message(&message),
            Err(DataTypeError::InvalidField { field: "pid", .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Hello::new("magi", "data-processor", 42).to_string(),
            "Hello[magi/data-processor:42]"
        );
    }
}
