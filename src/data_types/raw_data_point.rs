use std::fmt;

use chrono::{DateTime, Utc};

use super::{string_field, time_field, value_field, DataType};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::tag::TagSet;
use crate::time;
use crate::value::Value;

/// A located, time-stamped sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataPoint {
    /// Host the sample was collected on.
    pub location: String,
    /// Sample type, e.g. `system`.
    pub kind: String,
    /// Group within the kind, e.g. `memory`.
    pub group: String,
    /// Component within the group, e.g. `free`.
    pub component: String,
    /// Sampled value.
    pub value: Value,
    /// Collection time, microsecond precision.
    pub time_stamp: DateTime<Utc>,
}

impl RawDataPoint {
    /// Builds a point; the time is rounded to the microsecond.
    #[must_use]
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        group: impl Into<String>,
        component: impl Into<String>,
        value: impl Into<Value>,
        time_stamp: DateTime<Utc>,
    ) -> Self {
        Self {
            location: location.into(),
            kind: kind.into(),
            group: group.into(),
            component: component.into(),
            value: value.into(),
            time_stamp: time::round_to_micros(time_stamp),
        }
    }

    /// Tags describing where the sample came from, e.g.
    /// `location:magi, system:memory`.
    #[must_use]
    pub fn tag_set(&self) -> TagSet {
        [
            format!("location:{}", self.location),
            format!("{}:{}", self.kind, self.group),
        ]
        .into_iter()
        .collect()
    }
}

impl DataType for RawDataPoint {
    const NAME: &'static str = "RawDataPoint";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        Ok(Self {
            location: string_field(message, Self::NAME, "location")?,
            kind: string_field(message, Self::NAME, "type")?,
            group: string_field(message, Self::NAME, "group")?,
            component: string_field(message, Self::NAME, "component")?,
            value: value_field(message, Self::NAME, "value")?,
            time_stamp: time_field(message, Self::NAME, "time_stamp")?,
        })
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("location", self.location.as_str());
        message.insert("type", self.kind.as_str());
        message.insert("group", self.group.as_str());
        message.insert("component", self.component.as_str());
        message.insert("value", self.value.clone());
        message.insert("time_stamp", time::to_value(&self.time_stamp));
        message
    }
}

impl fmt::Display for RawDataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawDataPoint[{}][{}:{}/{}/{}]: {}",
            time::format(&self.time_stamp),
            self.location,
            self.kind,
            self.group,
            self.component,
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subject() -> RawDataPoint {
        RawDataPoint::new(
            "magi",
            "system",
            "memory",
            "cache",
            123,
            Utc.timestamp_opt(2, 350_000_000).unwrap(),
        )
    }

    #[test]
    fn test_message_shape() {
        let message = subject().to_message("Topic");
        assert_eq!(message.data_type(), "RawDataPoint");
        assert_eq!(message.topic(), "Topic");
        assert_eq!(message.get("location"), Some(&Value::from("magi")));
        assert_eq!(message.get("type"), Some(&Value::from("system")));
        assert_eq!(message.get("group"), Some(&Value::from("memory")));
        assert_eq!(message.get("component"), Some(&Value::from("cache")));
        assert_eq!(message.get("value"), Some(&Value::Int(123)));
        assert_eq!(message.get("time_stamp"), Some(&Value::Float(2.35)));
    }

    #[test]
    fn test_round_trip() {
        let loaded = Message::load(&subject().to_message("").to_bytes().unwrap()).unwrap();
        assert_eq!(RawDataPoint::from_message(&loaded).unwrap(), subject());
    }

    #[test]
    fn test_integer_time_stamp_is_accepted() {
        let mut message = subject().to_message("");
        message.insert("time_stamp", 2);
        let point = RawDataPoint::from_message(&message).unwrap();
        assert_eq!(point.time_stamp, Utc.timestamp_opt(2, 0).unwrap());
    }

    #[test]
    fn test_missing_time_stamp() {
        let mut message = Message::new("RawDataPoint", "");
        message.insert("location", "magi");
        message.insert("type", "system");
        message.insert("group", "memory");
        message.insert("component", "cache");
        message.insert("value", 1);
        assert!(matches!(
            RawDataPoint::from_message(&message),
            Err(DataTypeError::MissingField { field: "time_stamp", .. })
        ));
    }

    #[test]
    fn test_tag_set() {
        assert_eq!(subject().tag_set().to_string(), "location:magi, system:memory");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            subject().to_string(),
            "RawDataPoint[1970-01-01 00:00:02.350][magi:system/memory/cache]: 123"
        );
    }
}
