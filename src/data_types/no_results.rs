use std::fmt;

use super::DataType;
use crate::error::DataTypeError;
use crate::message::Message;

/// Marker sent when a query matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoResults;

impl DataType for NoResults {
    const NAME: &'static str = "NoResults";

    fn from_message(_message: &Message) -> Result<Self, DataTypeError> {
        Ok(Self)
    }

    fn to_message(&self, topic: &str) -> Message {
        Message::new(Self::NAME, topic)
    }
}

impl fmt::Display for NoResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoResults")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body() {
        let message = NoResults.to_message("q1");
        assert_eq!(message.data_type(), "NoResults");
        assert_eq!(message.topic(), "q1");
        assert!(message.body().is_empty());
        assert_eq!(NoResults::from_message(&message).unwrap(), NoResults);
    }
}
