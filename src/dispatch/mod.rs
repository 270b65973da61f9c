//! Callback dispatch for inbound frames.
//!
//! A [`CallbackRegister`] holds callbacks keyed by [`DispatchKey`] and routes
//! each fed frame to them in a fixed order:
//!
//! 1. raw callbacks, with the undecoded frame
//! 2. any callbacks, with every decoded record
//! 3. callbacks for the record's type: exact-topic ones first, then
//!    topic-less ones; if the type has no registration at all, the default
//!    callbacks in the same topic order
//!
//! Within a key, callbacks run in registration order. The callback lists are
//! copied before they run, so callbacks may register or close handles
//! freely; changes take effect from the next frame.
//!
//! The register is single-threaded (`Rc`-based) and meant to live on the
//! thread that polls the bus.

/// Selectors and keys.
pub mod key;
/// Registration handles.
pub mod handle;

pub use handle::CallbackHandle;
pub use key::{DispatchKey, Selector};

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::data_types::{DataType, DataTypeRegistry, Record};
use crate::error::{BusResult, DataTypeError};
use crate::message::deserialize;

/// Callback for undecoded frames.
pub type RawCallback = Rc<dyn Fn(&[u8])>;

/// Callback for decoded records; receives the record and its topic.
pub type RecordCallback = Rc<dyn Fn(&dyn Record, &str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CallbackId(u64);

#[derive(Clone)]
enum Callback {
    Raw(RawCallback),
    Record(RecordCallback),
}

#[derive(Default)]
pub(crate) struct Registrations {
    callbacks: HashMap<DispatchKey, Vec<(CallbackId, Callback)>>,
    /// Live registrations per record type, across all topics.
    type_counts: HashMap<TypeId, usize>,
    parsed_count: usize,
    next_id: u64,
}

impl Registrations {
    fn insert(&mut self, key: DispatchKey, callback: Callback) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;

        if let Selector::Type(type_id) = key.selector {
            *self.type_counts.entry(type_id).or_default() += 1;
        }
        if key.selector.is_parsed() {
            self.parsed_count += 1;
        }
        self.callbacks.entry(key).or_default().push((id, callback));
        id
    }

    pub(crate) fn remove(&mut self, key: &DispatchKey, id: CallbackId) {
        let Some(entries) = self.callbacks.get_mut(key) else {
            return;
        };
        let Some(position) = entries.iter().position(|(entry_id, _)| *entry_id == id) else {
            return;
        };

        entries.remove(position);
        if entries.is_empty() {
            self.callbacks.remove(key);
        }

        if let Selector::Type(type_id) = key.selector {
            if let Some(count) = self.type_counts.get_mut(&type_id) {
                *count -= 1;
                if *count == 0 {
                    self.type_counts.remove(&type_id);
                }
            }
        }
        if key.selector.is_parsed() {
            self.parsed_count -= 1;
        }
    }

    fn raw_callbacks(&self) -> Vec<RawCallback> {
        self.callbacks
            .get(&DispatchKey::new(Selector::Raw, None))
            .into_iter()
            .flatten()
            .filter_map(|(_, callback)| match callback {
                Callback::Raw(f) => Some(Rc::clone(f)),
                Callback::Record(_) => None,
            })
            .collect()
    }

    fn push_record_callbacks(&self, key: &DispatchKey, out: &mut Vec<RecordCallback>) {
        if let Some(entries) = self.callbacks.get(key) {
            out.extend(entries.iter().filter_map(|(_, callback)| match callback {
                Callback::Record(f) => Some(Rc::clone(f)),
                Callback::Raw(_) => None,
            }));
        }
    }

    /// Callbacks for one decoded record, in invocation order.
    fn record_callbacks(&self, type_id: TypeId, topic: &str) -> Vec<RecordCallback> {
        let mut out = Vec::new();
        self.push_record_callbacks(&DispatchKey::new(Selector::Any, None), &mut out);

        let selector = if self.type_counts.contains_key(&type_id) {
            Selector::Type(type_id)
        } else {
            Selector::Default
        };
        if !topic.is_empty() {
            self.push_record_callbacks(&DispatchKey::new(selector, Some(topic)), &mut out);
        }
        self.push_record_callbacks(&DispatchKey::new(selector, None), &mut out);
        out
    }
}

/// Routes inbound frames to registered callbacks.
#[derive(Clone)]
pub struct CallbackRegister {
    registrations: Rc<RefCell<Registrations>>,
    registry: Arc<DataTypeRegistry>,
}

impl CallbackRegister {
    /// Creates a register decoding with the shared built-in registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(DataTypeRegistry::shared())
    }

    /// Creates a register decoding with `registry`.
    #[must_use]
    pub fn with_registry(registry: Arc<DataTypeRegistry>) -> Self {
        Self {
            registrations: Rc::new(RefCell::new(Registrations::default())),
            registry,
        }
    }

    /// Registry used to decode frames.
    #[must_use]
    pub fn registry(&self) -> &Arc<DataTypeRegistry> {
        &self.registry
    }

    fn register(&self, key: DispatchKey, callback: Callback) -> CallbackHandle {
        let id = self.registrations.borrow_mut().insert(key.clone(), callback);
        CallbackHandle::new(Rc::downgrade(&self.registrations), key, id)
    }

    /// Registers for every frame, before decoding.
    pub fn on_raw<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&[u8]) + 'static,
    {
        self.register(
            DispatchKey::new(Selector::Raw, None),
            Callback::Raw(Rc::new(callback)),
        )
    }

    /// Registers for every decoded record.
    pub fn on_any<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&dyn Record, &str) + 'static,
    {
        self.register(
            DispatchKey::new(Selector::Any, None),
            Callback::Record(Rc::new(callback)),
        )
    }

    /// Registers for records whose type has no registration of its own.
    pub fn on_default<F>(&self, topic: Option<&str>, callback: F) -> CallbackHandle
    where
        F: Fn(&dyn Record, &str) + 'static,
    {
        self.register(
            DispatchKey::new(Selector::Default, topic),
            Callback::Record(Rc::new(callback)),
        )
    }

    /// Registers for records of type `T`, optionally on one topic only.
    pub fn on<T, F>(&self, topic: Option<&str>, callback: F) -> CallbackHandle
    where
        T: DataType,
        F: Fn(&T, &str) + 'static,
    {
        let wrapped = move |record: &dyn Record, topic: &str| {
            if let Some(record) = record.downcast_ref::<T>() {
                callback(record, topic);
            }
        };
        self.register(
            DispatchKey::new(Selector::of::<T>(), topic),
            Callback::Record(Rc::new(wrapped)),
        )
    }

    /// Number of live callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations
            .borrow()
            .callbacks
            .values()
            .map(Vec::len)
            .sum()
    }

    /// True if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.borrow().callbacks.is_empty()
    }

    /// Number of distinct keys with at least one callback.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.registrations.borrow().callbacks.len()
    }

    /// True if `key` has at least one callback.
    #[must_use]
    pub fn contains_key(&self, key: &DispatchKey) -> bool {
        self.registrations.borrow().callbacks.contains_key(key)
    }

    /// True if any callback needs decoded records.
    #[must_use]
    pub fn has_record_callbacks(&self) -> bool {
        self.registrations.borrow().parsed_count > 0
    }

    /// Dispatches one frame.
    ///
    /// Frames of a data type the registry does not know are dropped after
    /// the raw callbacks ran.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Deserialization` for a malformed envelope and
    /// `BusError::DataType` if a known record cannot be built from the body.
    pub fn feed(&self, raw: &[u8]) -> BusResult<()> {
        let raw_callbacks = self.registrations.borrow().raw_callbacks();
        for callback in raw_callbacks {
            callback(raw);
        }

        if !self.has_record_callbacks() {
            return Ok(());
        }

        let message = deserialize(raw)?;
        let record = match self.registry.from_message(&message) {
            Ok(record) => record,
            Err(DataTypeError::UnknownDataType { name }) => {
                debug!(
                    data_type = %name,
                    topic = %message.topic(),
                    "dropping message of unknown data type"
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.dispatch(record.as_ref(), message.topic());
        Ok(())
    }

    /// Runs the record-level callbacks for an already decoded record.
    pub fn dispatch(&self, record: &dyn Record, topic: &str) {
        let callbacks = self
            .registrations
            .borrow()
            .record_callbacks(record.data_type_id(), topic);
        trace!(
            data_type = record.data_type_name(),
            topic = %topic,
            callbacks = callbacks.len(),
            "dispatching record"
        );
        for callback in callbacks {
            callback(record, topic);
        }
    }
}

impl Default for CallbackRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegister")
            .field("callbacks", &self.len())
            .field("keys", &self.key_count())
            .field("registry", &self.registry)
            .finish()
    }
}
