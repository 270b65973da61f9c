//! # dms-bus - message bus core for the Distributed Monitoring System
//!
//! Monitoring nodes talk to each other over a publish/subscribe bus. This
//! crate holds everything above the socket layer:
//!
//! - **Envelope**: a three-line text header (`data_type/topic`, version,
//!   encoding) and a msgpack body, see [`message`]
//! - **Records**: typed messages such as [`RawDataPoint`] or [`Hello`] and
//!   the [`DataTypeRegistry`] that decodes them by wire name
//! - **Tags**: hierarchical `a:b:c` labels with regex-capable patterns and
//!   conjunctive/disjunctive queries, see [`tag`]
//! - **Dispatch**: the [`CallbackRegister`] that routes decoded records to
//!   callbacks by type and topic
//! - **Bus and discovery**: [`Bus`], [`BusDetector`] and [`BusResponder`]
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use dms_bus::{Bus, Hello, MemoryHub};
//!
//! let hub = MemoryHub::new();
//! let bus = Bus::connect(&hub);
//!
//! bus.on::<Hello, _>(Some("greetings"), |hello, topic| {
//!     println!("{topic}: {hello}");
//! });
//!
//! bus.send(&Hello::new("magi", "data-processor", 42), "greetings")?;
//! bus.poll(Some(Duration::from_millis(10)))?;
//! # Ok::<(), dms_bus::BusError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Wire layer
pub mod error;
pub mod message;
pub mod tag;
pub mod time;
pub mod value;

// Records and dispatch
pub mod data_types;
pub mod dispatch;

// Bus
pub mod bus;
pub mod config;
pub mod discovery;
pub mod event_loop;
pub mod transport;

// Re-export primary types at crate root for convenience
pub use bus::{Bus, Publisher};
pub use config::{DiscoveryConfig, NodeIdentity};
pub use data_types::{
    DataSet, DataSetQuery, DataType, DataTypeRegistry, Discover, Hello, HostFilter, NoResults,
    RawDataPoint, RawDatum, Record,
};
pub use discovery::{BusDetector, BusResponder, DiscoveryState};
pub use dispatch::{CallbackHandle, CallbackRegister, DispatchKey, Selector};
pub use error::{
    BusError, BusResult, DataTypeError, DeserializationError, DiscoveryError,
    SerializationError, TagError, TransportError,
};
pub use event_loop::{EventLoop, TimerHandle};
pub use message::{deserialize, serialize, Message};
pub use tag::{Tag, TagExpression, TagPattern, TagQuery, TagSet};
pub use transport::{Inbound, MemoryHub, Outbound};
pub use value::{Body, Value};
