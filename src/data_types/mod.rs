//! Typed records carried on the bus and the registry that builds them.
//!
//! Every record type implements [`DataType`]: it has a wire name and knows
//! how to read itself from, and write itself to, a [`Message`]. A
//! [`DataTypeRegistry`] maps wire names to converters so an incoming
//! envelope can be turned into a boxed [`Record`] without the receiver
//! knowing its type up front.
//!
//! Registries are plain values. [`DataTypeRegistry::shared`] hands out a
//! process-wide instance holding the built-in records for callers that do
//! not need isolation.

mod data_set;
mod data_set_query;
mod discover;
mod hello;
mod no_results;
mod raw_data_point;
mod raw_datum;

pub use data_set::{ComponentData, DataSet};
pub use data_set_query::DataSetQuery;
pub use discover::{Discover, HostFilter};
pub use hello::Hello;
pub use no_results::NoResults;
pub use raw_data_point::RawDataPoint;
pub use raw_datum::RawDatum;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::DataTypeError;
use crate::message::Message;
use crate::time;
use crate::value::Value;

/// A record type with a wire name and a message mapping.
pub trait DataType: Any + fmt::Debug + Sized {
    /// Wire name written to the envelope's `data_type` field.
    const NAME: &'static str;

    /// Reads the record from a decoded message.
    ///
    /// # Errors
    ///
    /// Returns `DataTypeError::MissingField` or `DataTypeError::InvalidField`
    /// when the body does not have the expected shape.
    fn from_message(message: &Message) -> Result<Self, DataTypeError>;

    /// Writes the record into a fresh message addressed to `topic`.
    fn to_message(&self, topic: &str) -> Message;
}

/// Object-safe view of any [`DataType`].
pub trait Record: Any + fmt::Debug {
    /// Wire name of the concrete type.
    fn data_type_name(&self) -> &'static str;

    /// `TypeId` of the concrete type.
    fn data_type_id(&self) -> TypeId;

    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Same as [`DataType::to_message`].
    fn envelope(&self, topic: &str) -> Message;
}

impl<T: DataType> Record for T {
    fn data_type_name(&self) -> &'static str {
        T::NAME
    }

    fn data_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn envelope(&self, topic: &str) -> Message {
        self.to_message(topic)
    }
}

impl dyn Record {
    /// Returns the concrete record if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: DataType>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// True if the record is a `T`.
    #[must_use]
    pub fn is<T: DataType>(&self) -> bool {
        self.data_type_id() == TypeId::of::<T>()
    }
}

type Converter = fn(&Message) -> Result<Box<dyn Record>, DataTypeError>;

fn convert<T: DataType>(message: &Message) -> Result<Box<dyn Record>, DataTypeError> {
    Ok(Box::new(T::from_message(message)?))
}

#[derive(Clone, Copy)]
struct Entry {
    type_id: TypeId,
    convert: Converter,
}

impl Entry {
    fn of<T: DataType>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            convert: convert::<T>,
        }
    }
}

/// Maps wire names to record converters.
#[derive(Clone, Default)]
pub struct DataTypeRegistry {
    types: HashMap<&'static str, Entry>,
}

impl DataTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every record defined in this crate.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        let types = [
            (Discover::NAME, Entry::of::<Discover>()),
            (Hello::NAME, Entry::of::<Hello>()),
            (RawDatum::NAME, Entry::of::<RawDatum>()),
            (RawDataPoint::NAME, Entry::of::<RawDataPoint>()),
            (DataSet::NAME, Entry::of::<DataSet>()),
            (DataSetQuery::NAME, Entry::of::<DataSetQuery>()),
            (NoResults::NAME, Entry::of::<NoResults>()),
        ]
        .into_iter()
        .collect();
        Self { types }
    }

    /// Process-wide registry of the built-in records.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<DataTypeRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::with_builtin_types())))
    }

    /// Registers `T` under its wire name.
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DataTypeError::NameClash` if a different type already owns
    /// the name.
    pub fn register<T: DataType>(&mut self) -> Result<(), DataTypeError> {
        if let Some(existing) = self.types.get(T::NAME) {
            if existing.type_id == TypeId::of::<T>() {
                return Ok(());
            }
            warn!(data_type = T::NAME, "data type name already registered to a different type");
            return Err(DataTypeError::NameClash { name: T::NAME });
        }

        self.types.insert(T::NAME, Entry::of::<T>());
        Ok(())
    }

    /// True if a type is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered wire names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Converts a decoded message into its registered record type.
    ///
    /// # Errors
    ///
    /// Returns `DataTypeError::UnknownDataType` if nothing is registered
    /// under the message's data type, or the record's own conversion error.
    pub fn from_message(&self, message: &Message) -> Result<Box<dyn Record>, DataTypeError> {
        let entry = self
            .types
            .get(message.data_type())
            .ok_or_else(|| DataTypeError::UnknownDataType {
                name: message.data_type().to_string(),
            })?;
        (entry.convert)(message)
    }
}

impl fmt::Debug for DataTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

// Body field readers shared by the record impls.

pub(crate) fn field<'a>(
    message: &'a Message,
    data_type: &'static str,
    field: &'static str,
) -> Result<&'a Value, DataTypeError> {
    match message.get(field) {
        Some(value) if !value.is_nil() => Ok(value),
        _ => Err(DataTypeError::MissingField { data_type, field }),
    }
}

/// Like [`field`], but a present nil is a value rather than a gap.
pub(crate) fn value_field(
    message: &Message,
    data_type: &'static str,
    field: &'static str,
) -> Result<Value, DataTypeError> {
    message
        .get(field)
        .cloned()
        .ok_or(DataTypeError::MissingField { data_type, field })
}

pub(crate) fn invalid(
    data_type: &'static str,
    field: &'static str,
    expected: &str,
    got: &Value,
) -> DataTypeError {
    DataTypeError::InvalidField {
        data_type,
        field,
        reason: format!("expected {expected}, got {}", got.type_name()),
    }
}

pub(crate) fn string_field(
    message: &Message,
    data_type: &'static str,
    name: &'static str,
) -> Result<String, DataTypeError> {
    let value = field(message, data_type, name)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(data_type, name, "string", value))
}

pub(crate) fn int_field(
    message: &Message,
    data_type: &'static str,
    name: &'static str,
) -> Result<i64, DataTypeError> {
    let value = field(message, data_type, name)?;
    value
        .as_int()
        .ok_or_else(|| invalid(data_type, name, "integer", value))
}

pub(crate) fn float_field(
    message: &Message,
    data_type: &'static str,
    name: &'static str,
) -> Result<f64, DataTypeError> {
    let value = field(message, data_type, name)?;
    value
        .as_float()
        .ok_or_else(|| invalid(data_type, name, "number", value))
}

pub(crate) fn time_field(
    message: &Message,
    data_type: &'static str,
    name: &'static str,
) -> Result<DateTime<Utc>, DataTypeError> {
    let value = field(message, data_type, name)?;
    time::from_value(value).ok_or_else(|| invalid(data_type, name, "epoch seconds", value))
}

pub(crate) fn optional_time_field(
    message: &Message,
    data_type: &'static str,
    name: &'static str,
) -> Result<Option<DateTime<Utc>>, DataTypeError> {
    match message.get(name) {
        None | Some(Value::Nil) => Ok(None),
        Some(value) => time::from_value(value)
            .map(Some)
            .ok_or_else(|| invalid(data_type, name, "epoch seconds", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping {
        seq: i64,
    }

    impl DataType for Ping {
        const NAME: &'static str = "Ping";

        fn from_message(message: &Message) -> Result<Self, DataTypeError> {
            Ok(Self {
                seq: int_field(message, Self::NAME, "seq")?,
            })
        }

        fn to_message(&self, topic: &str) -> Message {
            let mut message = Message::new(Self::NAME, topic);
            message.insert("seq", self.seq);
            message
        }
    }

    #[derive(Debug)]
    struct FakeHello;

    impl DataType for FakeHello {
        const NAME: &'static str = "Hello";

        fn from_message(_message: &Message) -> Result<Self, DataTypeError> {
            Ok(Self)
        }

        fn to_message(&self, topic: &str) -> Message {
            Message::new(Self::NAME, topic)
        }
    }

    #[test]
    fn test_register_and_convert() {
        let mut registry = DataTypeRegistry::new();
        registry.register::<Ping>().unwrap();

        let record = registry.from_message(&Ping { seq: 7 }.to_message("")).unwrap();
        assert_eq!(record.data_type_name(), "Ping");
        assert!(record.is::<Ping>());
        assert_eq!(record.downcast_ref::<Ping>(), Some(&Ping { seq: 7 }));
        assert!(record.downcast_ref::<Hello>().is_none());
    }

    #[test]
    fn test_unknown_data_type() {
        let registry = DataTypeRegistry::new();
        let err = registry.from_message(&Message::new("Bogus", "")).unwrap_err();
        match err {
            DataTypeError::UnknownDataType { name } => assert_eq!(name, "Bogus"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reregistering_same_type_is_noop() {
        let mut registry = DataTypeRegistry::new();
        registry.register::<Ping>().unwrap();
        registry.register::<Ping>().unwrap();
        assert_eq!(registry.names(), vec!["Ping"]);
    }

    #[test]
    fn test_name_clash_is_rejected() {
        let mut registry = DataTypeRegistry::with_builtin_types();
        let err = registry.register::<FakeHello>().unwrap_err();
        assert!(matches!(err, DataTypeError::NameClash { name: "Hello" }));

        let hello = Hello::new("magi", "test", 1).to_message("");
        assert!(registry.from_message(&hello).unwrap().is::<Hello>());
    }

    #[test]
    fn test_builtin_names() {
        let registry = DataTypeRegistry::with_builtin_types();
        assert_eq!(
            registry.names(),
            vec![
                "DataSet",
                "DataSetQuery",
                "Discover",
                "Hello",
                "NoResults",
                "RawDataPoint",
                "RawDatum"
            ]
        );
        assert!(DataTypeRegistry::shared().contains("Discover"));
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let mut registry = DataTypeRegistry::new();
        registry.register::<Ping>().unwrap();

        let err = registry.from_message(&Message::new("Ping", "")).unwrap_err();
        assert!(matches!(
            err,
            DataTypeError::MissingField { data_type: "Ping", field: "seq" }
        ));

        let mut message = Message::new("Ping", "");
        message.insert("seq", "seven");
        let err = registry.from_message(&message).unwrap_err();
        assert!(matches!(err, DataTypeError::InvalidField { field: "seq", .. }));
    }
}
