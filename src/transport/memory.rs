use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::{Inbound, Outbound, MAX_FRAME_BYTES};
use crate::error::TransportError;

#[derive(Debug, Clone)]
struct Frame {
    data: Vec<u8>,
    more: bool,
}

#[derive(Debug)]
struct Subscription {
    id: u64,
    prefixes: Vec<String>,
    tx: Sender<Frame>,
}

impl Subscription {
    fn accepts(&self, frame: &[u8]) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| frame.starts_with(prefix.as_bytes()))
    }
}

#[derive(Debug, Default)]
struct HubState {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process pub/sub fan-out.
///
/// Every subscriber whose prefixes match the first frame of a message gets
/// all frames of that message; everyone else gets none of them. A
/// subscriber with no prefixes receives nothing.
///
/// Handles are `Send + Sync`, so the two ends of a bus may live on
/// different threads.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    /// A hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sending end.
    #[must_use]
    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            state: Arc::clone(&self.state),
            recipients: Mutex::new(None),
        }
    }

    /// Creates a receiving end with no subscriptions.
    #[must_use]
    pub fn subscriber(&self) -> MemorySubscriber {
        let (tx, rx) = unbounded();
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.subscriptions.push(Subscription {
            id,
            prefixes: Vec::new(),
            tx,
        });

        MemorySubscriber {
            id,
            state: Arc::clone(&self.state),
            rx,
            buffered: None,
            more: false,
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscriptions.len()
    }
}

/// Sending end of a [`MemoryHub`].
#[derive(Debug)]
pub struct MemoryPublisher {
    state: Arc<Mutex<HubState>>,
    /// Recipients of the message currently being sent, between its frames.
    recipients: Mutex<Option<Vec<Sender<Frame>>>>,
}

impl Outbound for MemoryPublisher {
    fn send(&self, frame: &[u8], more: bool) -> Result<(), TransportError> {
        if frame.len() > MAX_FRAME_BYTES {
            return Err(TransportError::Rejected {
                reason: format!(
                    "frame of {} bytes exceeds limit of {MAX_FRAME_BYTES}",
                    frame.len()
                ),
            });
        }

        let mut pending = lock(&self.recipients);
        let recipients = match pending.take() {
            Some(recipients) => recipients,
            None => lock(&self.state)
                .subscriptions
                .iter()
                .filter(|s| s.accepts(frame))
                .map(|s| s.tx.clone())
                .collect(),
        };

        for tx in &recipients {
            // A subscriber dropped mid-message just misses the rest.
            let _ = tx.send(Frame {
                data: frame.to_vec(),
                more,
            });
        }

        if more {
            *pending = Some(recipients);
        }
        Ok(())
    }
}

/// Receiving end of a [`MemoryHub`].
#[derive(Debug)]
pub struct MemorySubscriber {
    id: u64,
    state: Arc<Mutex<HubState>>,
    rx: Receiver<Frame>,
    buffered: Option<Frame>,
    more: bool,
}

impl MemorySubscriber {
    /// Prefixes this subscriber currently receives, in subscription order.
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        lock(&self.state)
            .subscriptions
            .iter()
            .find(|s| s.id == self.id)
            .map(|s| s.prefixes.clone())
            .unwrap_or_default()
    }

    fn take(&mut self, frame: Frame) -> Vec<u8> {
        self.more = frame.more;
        frame.data
    }
}

impl Inbound for MemorySubscriber {
    fn subscribe(&mut self, prefix: &str) {
        let mut state = lock(&self.state);
        if let Some(subscription) = state.subscriptions.iter_mut().find(|s| s.id == self.id) {
            if !subscription.prefixes.iter().any(|p| p == prefix) {
                subscription.prefixes.push(prefix.to_string());
            }
        }
    }

    fn unsubscribe(&mut self, prefix: &str) {
        let mut state = lock(&self.state);
        if let Some(subscription) = state.subscriptions.iter_mut().find(|s| s.id == self.id) {
            subscription.prefixes.retain(|p| p != prefix);
        }
    }

    fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(frame) = self.buffered.take() {
            return Ok(Some(self.take(frame)));
        }

        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(self.take(frame))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn has_more(&self) -> bool {
        self.more
    }

    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool, TransportError> {
        if self.buffered.is_some() || !self.rx.is_empty() {
            return Ok(true);
        }

        let frame = match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            },
            None => self.rx.recv().map_err(|_| TransportError::Closed)?,
        };
        self.buffered = Some(frame);
        Ok(true)
    }
}

impl Drop for MemorySubscriber {
    fn drop(&mut self) {
        lock(&self.state).subscriptions.retain(|s| s.id != self.id);
    }
}
