use std::fmt;

use chrono::{DateTime, Utc};

use super::{float_field, string_field, time_field, DataType};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::tag::TagExpression;
use crate::time;

/// Request for the data sets matching a tag expression over a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetQuery {
    /// Caller-chosen id, echoed back as the topic of the results.
    pub query_id: String,
    /// Selects the sources to report on.
    pub tag_expression: TagExpression,
    /// Start of the window.
    pub time_from: DateTime<Utc>,
    /// End of the window.
    pub time_to: DateTime<Utc>,
    /// Sample spacing in seconds.
    pub granularity: f64,
}

impl DataSetQuery {
    /// Builds a query; times are rounded to the microsecond.
    #[must_use]
    pub fn new(
        query_id: impl Into<String>,
        tag_expression: TagExpression,
        time_from: DateTime<Utc>,
        time_to: DateTime<Utc>,
        granularity: f64,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            tag_expression,
            time_from: time::round_to_micros(time_from),
            time_to: time::round_to_micros(time_to),
            granularity,
        }
    }
}

impl DataType for DataSetQuery {
    const NAME: &'static str = "DataSetQuery";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        let expression = string_field(message, Self::NAME, "tag_expression")?;
        let tag_expression =
            TagExpression::parse(&expression).map_err(|e| DataTypeError::InvalidField {
                data_type: Self::NAME,
                field: "tag_expression",
                reason: e.to_string(),
            })?;

        Ok(Self {
            query_id: string_field(message, Self::NAME, "query_id")?,
            tag_expression,
            time_from: time_field(message, Self::NAME, "time_from")?,
            time_to: time_field(message, Self::NAME, "time_to")?,
            granularity: float_field(message, Self::NAME, "granularity")?,
        })
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("query_id", self.query_id.as_str());
        message.insert("tag_expression", self.tag_expression.to_string());
        message.insert("time_from", time::to_value(&self.time_from));
        message.insert("time_to", time::to_value(&self.time_to));
        message.insert("granularity", self.granularity);
        message
    }
}

impl fmt::Display for DataSetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataSetQuery[{}][{}]: {} {}",
            self.query_id,
            self.tag_expression,
            time::format(&self.time_from),
            time::format(&self.time_to)
        )
    }
}
