use std::fmt;

use chrono::{DateTime, Utc};

use super::{optional_time_field, string_field, value_field, DataType, RawDataPoint};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::time;
use crate::value::Value;

/// A sample as produced by a collector, before it is tied to a location.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDatum {
    /// Sample type, e.g. `system`.
    pub kind: String,
    /// Group within the kind, e.g. `memory`.
    pub group: String,
    /// Component within the group, e.g. `free`.
    pub component: String,
    /// Sampled value.
    pub value: Value,
    /// Collection time, if the collector recorded one.
    pub time_stamp: Option<DateTime<Utc>>,
}

impl RawDatum {
    /// An unstamped sample.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        group: impl Into<String>,
        component: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            kind: kind.into(),
            group: group.into(),
            component: component.into(),
            value: value.into(),
            time_stamp: None,
        }
    }

    /// Stamps the sample, rounded to the microsecond.
    #[must_use]
    pub fn with_time_stamp(mut self, time_stamp: DateTime<Utc>) -> Self {
        self.time_stamp = Some(time::round_to_micros(time_stamp));
        self
    }

    /// Attaches a location, stamping with the current time if unstamped.
    #[must_use]
    pub fn to_raw_data_point(&self, location: impl Into<String>) -> RawDataPoint {
        self.to_raw_data_point_at(location, Utc::now())
    }

    /// Attaches a location, stamping with `time` if unstamped.
    #[must_use]
    pub fn to_raw_data_point_at(
        &self,
        location: impl Into<String>,
        time: DateTime<Utc>,
    ) -> RawDataPoint {
        RawDataPoint {
            location: location.into(),
            kind: self.kind.clone(),
            group: self.group.clone(),
            component: self.component.clone(),
            value: self.value.clone(),
            time_stamp: self.time_stamp.unwrap_or_else(|| time::round_to_micros(time)),
        }
    }
}

impl DataType for RawDatum {
    const NAME: &'static str = "RawDatum";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        Ok(Self {
            kind: string_field(message, Self::NAME, "type")?,
            group: string_field(message, Self::NAME, "group")?,
            component: string_field(message, Self::NAME, "component")?,
            value: value_field(message, Self::NAME, "value")?,
            time_stamp: optional_time_field(message, Self::NAME, "time_stamp")?,
        })
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("type", self.kind.as_str());
        message.insert("group", self.group.as_str());
        message.insert("component", self.component.as_str());
        message.insert("value", self.value.clone());
        if let Some(time_stamp) = &self.time_stamp {
            message.insert("time_stamp", time::to_value(time_stamp));
        }
        message
    }
}

impl fmt::Display for RawDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawDatum")?;
        if let Some(time_stamp) = &self.time_stamp {
            write!(f, "[{}]", time::format(time_stamp))?;
        }
        write!(
            f,
            "[{}/{}/{}]: {}",
            self.kind, self.group, self.component, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subject() -> RawDatum {
        RawDatum::new("system", "memory", "cache", 123)
    }

    #[test]
    fn test_message_shape() {
        let message = subject().to_message("");
        assert_eq!(message.data_type(), "RawDatum");
        assert_eq!(message.topic(), "");
        assert_eq!(message.get("type"), Some(&Value::from("system")));
        assert_eq!(message.get("group"), Some(&Value::from("memory")));
        assert_eq!(message.get("component"), Some(&Value::from("cache")));
        assert_eq!(message.get("value"), Some(&Value::Int(123)));
        assert!(message.get("time_stamp").is_none());
    }

    #[test]
    fn test_round_trip_with_time_stamp() {
        let datum = subject().with_time_stamp(Utc.timestamp_opt(2, 350_000_000).unwrap());
        let loaded = Message::load(&datum.to_message("").to_bytes().unwrap()).unwrap();
        assert_eq!(RawDatum::from_message(&loaded).unwrap(), datum);
    }

    #[test]
    fn test_to_raw_data_point() {
        let at = Utc.timestamp_opt(100, 0).unwrap();
        let point = subject().to_raw_data_point_at("magi", at);
        assert_eq!(point.location, "magi");
        assert_eq!(point.kind, "system");
        assert_eq!(point.group, "memory");
        assert_eq!(point.component, "cache");
        assert_eq!(point.value, Value::Int(123));
        assert_eq!(point.time_stamp, at);

        let stamped = Utc.timestamp_opt(5, 0).unwrap();
        let point = subject()
            .with_time_stamp(stamped)
            .to_raw_data_point_at("magi", at);
        assert_eq!(point.time_stamp, stamped);
    }

    #[test]
    fn test_to_raw_data_point_now() {
        let before = time::round_to_micros(Utc::now());
        let point = subject().to_raw_data_point("magi");
        assert!(point.time_stamp >= before);
        assert_eq!(point.time_stamp, time::round_to_micros(point.time_stamp));
    }

    #[test]
    fn test_stamped_now_survives_the_wire() {
        let point = subject().to_raw_data_point("magi");
        let loaded = Message::load(&point.to_message("").to_bytes().unwrap()).unwrap();
        assert_eq!(RawDataPoint::from_message(&loaded).unwrap(), point);
    }

    #[test]
    fn test_sub_microsecond_stamp_is_rounded() {
        let stamp = Utc.timestamp_opt(1_700_000_000, 551_828_381).unwrap();
        let datum = subject().with_time_stamp(stamp);
        assert_eq!(
            datum.time_stamp,
            Some(Utc.timestamp_opt(1_700_000_000, 551_828_000).unwrap())
        );
        let loaded = Message::load(&datum.to_message("").to_bytes().unwrap()).unwrap();
        assert_eq!(RawDatum::from_message(&loaded).unwrap(), datum);
    }

    #[test]
    fn test_nil_value_survives_the_wire() {
        let datum = RawDatum::new("system", "memory", "free", Value::Nil);
        let loaded = Message::load(&datum.to_message("").to_bytes().unwrap()).unwrap();
        assert_eq!(RawDatum::from_message(&loaded).unwrap(), datum);
    }

    #[test]
    fn test_absent_value_is_missing() {
        let mut message = Message::new(RawDatum::NAME, "");
        message.insert("type", "system");
        message.insert("group", "memory");
        message.insert("component", "free");
        assert!(matches!(
            RawDatum::from_message(&message),
            Err(DataTypeError::MissingField { field: "value", .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(subject().to_string(), "RawDatum[system/memory/cache]: 123");
    }
}
