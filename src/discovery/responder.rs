use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::bus::Bus;
use crate::config::NodeIdentity;
use crate::data_types::{Discover, Hello};
use crate::dispatch::CallbackHandle;

/// Answers discovery probes addressed to this node.
///
/// A probe matches when its host filter is empty, a pattern found in this
/// node's host name, or equal to it, and its program filter is empty or
/// equal to this node's program. The `Hello` reply goes out on the probe's
/// topic.
#[derive(Debug)]
pub struct BusResponder {
    identity: Rc<NodeIdentity>,
    handle: CallbackHandle,
}

impl BusResponder {
    /// Starts answering probes on `bus` as `identity`.
    pub fn new(bus: &Bus, identity: NodeIdentity) -> Self {
        let identity = Rc::new(identity);
        let publisher = bus.publisher();

        let node = Rc::clone(&identity);
        let handle = bus.on::<Discover, _>(None, move |probe, topic| {
            if !probe.matches(&node.host_name, &node.program) {
                debug!(probe = %probe, topic = %topic, "ignoring discovery probe for another node");
                return;
            }

            let hello = Hello::new(node.host_name.as_str(), node.program.as_str(), node.pid);
            info!(probe = %probe, topic = %topic, hello = %hello, "answering discovery probe");
            if let Err(err) = publisher.send(&hello, topic) {
                warn!(error = %err, topic = %topic, "failed to answer discovery probe");
            }
        });

        Self { identity, handle }
    }

    /// Identity announced in replies.
    #[must_use]
    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Stops answering probes.
    pub fn close(&self) {
        self.handle.close();
    }
}

impl Drop for BusResponder {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryHub;
    use std::cell::RefCell;

    fn replies_to(probe: &Discover) -> Vec<Hello> {
        let hub = MemoryHub::new();
        let bus = Bus::connect(&hub);
        let _responder = BusResponder::new(&bus, NodeIdentity::new("magi", "data-processor", 42));

        let replies = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&replies);
        let _listener = bus.on::<Hello, _>(Some("probe-1"), move |hello, _| {
            r.borrow_mut().push(hello.clone());
        });

        bus.send(probe, "probe-1").unwrap();
        bus.poll_pending().unwrap();
        let replies = replies.borrow().clone();
        replies
    }

    #[test]
    fn test_answers_wildcard_probe() {
        assert_eq!(
            replies_to(&Discover::any()),
            vec![Hello::new("magi", "data-processor", 42)]
        );
    }

    #[test]
    fn test_answers_matching_filters() {
        assert_eq!(replies_to(&Discover::new("magi", "data-processor").unwrap()).len(), 1);
        assert_eq!(replies_to(&Discover::new("/MA/", "").unwrap()).len(), 1);
        assert_eq!(replies_to(&Discover::new("", "data-processor").unwrap()).len(), 1);
    }

    #[test]
    fn test_ignores_other_nodes() {
        assert!(replies_to(&Discover::new("nina", "").unwrap()).is_empty());
        assert!(replies_to(&Discover::new("/^agi/", "").unwrap()).is_empty());
        assert!(replies_to(&Discover::new("", "console").unwrap()).is_empty());
    }

    #[test]
    fn test_close_stops_answering() {
        let hub = MemoryHub::new();
        let bus = Bus::connect(&hub);
        let responder = BusResponder::new(&bus, NodeIdentity::new("magi", "p", 1));
        assert_eq!(responder.identity().host_name, "magi");

        responder.close();
        assert!(bus.callbacks().is_empty());
    }
}
