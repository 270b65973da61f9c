//! Transport seam between the bus and the wire.
//!
//! The bus only needs to push frames out ([`Outbound`]) and pull frames in
//! ([`Inbound`]). Socket libraries plug in behind these traits;
//! [`MemoryHub`] is an in-process implementation with pub/sub prefix
//! filtering.
//!
//! Frames travel one at a time. A sender marks all but the last frame of a
//! multi-frame message with `more = true`; a receiver learns the same through
//! [`Inbound::has_more`] after each frame.

/// In-process pub/sub hub.
pub mod memory;

pub use memory::{MemoryHub, MemoryPublisher, MemorySubscriber};

use std::time::Duration;

use crate::error::TransportError;

/// Maximum size of one frame accepted by the in-process transport.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// Subscription prefix matching every frame.
pub const SUBSCRIBE_ALL: &str = "";

/// Sending half of a bus connection.
pub trait Outbound {
    /// Hands one frame to the channel.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` if the channel is closed or refuses the
    /// frame.
    fn send(&self, frame: &[u8], more: bool) -> Result<(), TransportError>;
}

/// Receiving half of a bus connection.
pub trait Inbound {
    /// Starts delivering frames that begin with `prefix`.
    fn subscribe(&mut self, prefix: &str);

    /// Stops delivering frames that begin with `prefix`. Frames already
    /// queued stay queued.
    fn unsubscribe(&mut self, prefix: &str);

    /// Pulls one frame without blocking.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the channel is gone.
    fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// True if the frame last received is followed by another frame of the
    /// same message.
    fn has_more(&self) -> bool;

    /// Blocks until a frame is available or `timeout` elapses (`None`
    /// waits forever). Returns whether a frame is available.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the channel is gone.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool, TransportError>;
}

/// Prefix selecting every topic of `data_type`.
#[must_use]
pub fn type_prefix(data_type: &str) -> String {
    format!("{data_type}/")
}

/// Prefix selecting one exact topic of `data_type`.
#[must_use]
pub fn topic_prefix(data_type: &str, topic: &str) -> String {
    format!("{data_type}/{topic}\n")
}

/// Prefix for a registration on `data_type`, optionally narrowed to `topic`.
#[must_use]
pub fn subscription_prefix(data_type: &str, topic: Option<&str>) -> String {
    match topic {
        Some(topic) if !topic.is_empty() => topic_prefix(data_type, topic),
        _ => type_prefix(data_type),
    }
}
