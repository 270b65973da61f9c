use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::{field, invalid, string_field, time_field, DataType};
use crate::error::DataTypeError;
use crate::message::Message;
use crate::tag::TagSet;
use crate::time;
use crate::value::Value;

/// Time series per component name, in insertion order within a component.
pub type ComponentData = BTreeMap<String, Vec<(DateTime<Utc>, Value)>>;

/// Query result: time series for one tagged source over a time window.
///
/// On the wire each component's series is a flat `[t0, v0, t1, v1, ...]`
/// array with times as epoch seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Data type of the series, e.g. `system`.
    pub type_name: String,
    /// Tags of the source the series came from.
    pub tag_set: TagSet,
    /// Unit of every value in the set.
    pub unit: String,
    /// Start of the window, inclusive.
    pub time_from: DateTime<Utc>,
    /// End of the window, inclusive.
    pub time_to: DateTime<Utc>,
    /// Series per component name.
    pub component_data: ComponentData,
}

impl DataSet {
    /// Builds a data set; times are rounded to the microsecond.
    #[must_use]
    pub fn new(
        type_name: impl Into<String>,
        tag_set: TagSet,
        unit: impl Into<String>,
        time_from: DateTime<Utc>,
        time_to: DateTime<Utc>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            tag_set,
            unit: unit.into(),
            time_from: time::round_to_micros(time_from),
            time_to: time::round_to_micros(time_to),
            component_data: ComponentData::new(),
        }
    }

    /// Appends one sample to `component`'s series.
    pub fn push(
        &mut self,
        component: impl Into<String>,
        time: DateTime<Utc>,
        value: impl Into<Value>,
    ) {
        self.component_data
            .entry(component.into())
            .or_default()
            .push((time::round_to_micros(time), value.into()));
    }

    /// Builder-style `push`.
    #[must_use]
    pub fn with_point(
        mut self,
        component: impl Into<String>,
        time: DateTime<Utc>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(component, time, value);
        self
    }

    fn component_data_to_value(&self) -> Value {
        Value::Map(
            self.component_data
                .iter()
                .map(|(component, series)| {
                    let flat = series
                        .iter()
                        .flat_map(|(t, v)| [time::to_value(t), v.clone()])
                        .collect();
                    (Value::from(component.as_str()), Value::Array(flat))
                })
                .collect(),
        )
    }

    fn component_data_from_value(value: &Value) -> Result<ComponentData, DataTypeError> {
        let pairs = value
            .as_map()
            .ok_or_else(|| invalid(Self::NAME, "component_data", "map", value))?;

        let mut data = ComponentData::new();
        for (component, series) in pairs {
            let flat = series
                .as_array()
                .ok_or_else(|| invalid(Self::NAME, "component_data", "array", series))?;
            if flat.len() % 2 != 0 {
                return Err(DataTypeError::InvalidField {
                    data_type: Self::NAME,
                    field: "component_data",
                    reason: format!(
                        "odd number of entries for component '{}'",
                        component.to_key()
                    ),
                });
            }

            let points = data.entry(component.to_key()).or_default();
            for pair in flat.chunks_exact(2) {
                let time = time::from_value(&pair[0]).ok_or_else(|| {
                    invalid(Self::NAME, "component_data", "epoch seconds", &pair[0])
                })?;
                points.push((time, pair[1].clone()));
            }
        }
        Ok(data)
    }
}

impl DataType for DataSet {
    const NAME: &'static str = "DataSet";

    fn from_message(message: &Message) -> Result<Self, DataTypeError> {
        Ok(Self {
            type_name: string_field(message, Self::NAME, "type_name")?,
            tag_set: TagSet::parse(&string_field(message, Self::NAME, "tag_set")?),
            unit: string_field(message, Self::NAME, "unit")?,
            time_from: time_field(message, Self::NAME, "time_from")?,
            time_to: time_field(message, Self::NAME, "time_to")?,
            component_data: Self::component_data_from_value(field(
                message,
                Self::NAME,
                "component_data",
            )?)?,
        })
    }

    fn to_message(&self, topic: &str) -> Message {
        let mut message = Message::new(Self::NAME, topic);
        message.insert("type_name", self.type_name.as_str());
        message.insert("tag_set", self.tag_set.to_string());
        message.insert("unit", self.unit.as_str());
        message.insert("time_from", time::to_value(&self.time_from));
        message.insert("time_to", time::to_value(&self.time_to));
        message.insert("component_data", self.component_data_to_value());
        message
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components = self
            .component_data
            .iter()
            .map(|(name, series)| format!("{name}({})", series.len()))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "DataSet[{}][{}]: {components}", self.type_name, self.tag_set)
    }
}
