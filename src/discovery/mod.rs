//! Service discovery over the bus.
//!
//! A [`BusDetector`] broadcasts [`Discover`](crate::Discover) probes on a
//! fixed interval until a [`Hello`](crate::Hello) arrives on its private probe
//! topic or the deadline passes. A [`BusResponder`] answers probes whose
//! host and program filters match the local node.

/// Probe sender.
pub mod detector;
/// Probe answerer.
pub mod responder;

pub use detector::{BusDetector, DiscoveryState};
pub use responder::BusResponder;
