use std::any::TypeId;

use crate::data_types::DataType;

/// Which messages a registration wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Every inbound frame, before decoding.
    Raw,
    /// Every successfully decoded record.
    Any,
    /// Records of exactly one type.
    Type(TypeId),
    /// Records whose type has no registration of its own.
    Default,
}

impl Selector {
    /// Selector for records of type `T`.
    #[must_use]
    pub fn of<T: DataType>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    /// True for selectors that need the frame decoded.
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        !matches!(self, Self::Raw)
    }
}

/// Selector plus optional exact topic; `None` matches every topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    /// Which records the callback wants.
    pub selector: Selector,
    /// Exact topic, or `None` for any.
    pub topic: Option<String>,
}

impl DispatchKey {
    /// Builds a key; an empty topic is the same as no topic.
    #[must_use]
    pub fn new(selector: Selector, topic: Option<&str>) -> Self {
        Self {
            selector,
            topic: topic.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }
}
