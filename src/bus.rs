//! A bus connection: one outbound and one inbound channel behind a single
//! `on`/`send` API, plus the timers that run on its poll loop.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{trace, warn};

use crate::data_types::{DataType, DataTypeRegistry, Record};
use crate::dispatch::{CallbackHandle, CallbackRegister};
use crate::error::BusResult;
use crate::event_loop::EventLoop;
use crate::transport::{subscription_prefix, Inbound, MemoryHub, Outbound, SUBSCRIBE_ALL};

/// Clonable sending half of a [`Bus`], for use inside callbacks and timers.
#[derive(Clone)]
pub struct Publisher {
    outbound: Rc<dyn Outbound>,
}

impl Publisher {
    /// Encodes `record` and sends it as a single frame.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Serialization` if the record cannot be encoded and
    /// `BusError::Transport` if the channel refuses the frame.
    pub fn send<R: Record + ?Sized>(&self, record: &R, topic: &str) -> BusResult<()> {
        let frame = record.envelope(topic).to_bytes()?;
        trace!(
            data_type = record.data_type_name(),
            topic = %topic,
            bytes = frame.len(),
            "sending record"
        );
        self.outbound.send(&frame, false)?;
        Ok(())
    }

    /// Sends one raw frame.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Transport` if the channel refuses the frame.
    pub fn send_raw(&self, frame: &[u8], more: bool) -> BusResult<()> {
        self.outbound.send(frame, more)?;
        Ok(())
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

/// Inbound channel plus how many live registrations need each prefix.
struct Subscriptions {
    inbound: Box<dyn Inbound>,
    counts: HashMap<String, usize>,
}

impl Subscriptions {
    fn acquire(&mut self, prefix: &str) {
        let count = self.counts.entry(prefix.to_string()).or_default();
        if *count == 0 {
            self.inbound.subscribe(prefix);
        }
        *count += 1;
    }

    fn release(&mut self, prefix: &str) {
        let Some(count) = self.counts.get_mut(prefix) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(prefix);
            self.inbound.unsubscribe(prefix);
        }
    }
}

/// Inbound and outbound channel pair with callback dispatch and timers.
///
/// Each registration keeps its inbound subscription prefix alive; closing
/// the last handle that needs a prefix unsubscribes it.
///
/// Everything runs on the thread that calls [`Bus::poll`].
pub struct Bus {
    publisher: Publisher,
    subscriptions: Rc<RefCell<Subscriptions>>,
    register: CallbackRegister,
    event_loop: EventLoop,
}

impl Bus {
    /// Creates a bus decoding with the shared built-in registry.
    pub fn new(outbound: impl Outbound + 'static, inbound: impl Inbound + 'static) -> Self {
        Self::with_registry(outbound, inbound, DataTypeRegistry::shared())
    }

    /// Creates a bus decoding with `registry`.
    pub fn with_registry(
        outbound: impl Outbound + 'static,
        inbound: impl Inbound + 'static,
        registry: Arc<DataTypeRegistry>,
    ) -> Self {
        Self {
            publisher: Publisher {
                outbound: Rc::new(outbound),
            },
            subscriptions: Rc::new(RefCell::new(Subscriptions {
                inbound: Box::new(inbound),
                counts: HashMap::new(),
            })),
            register: CallbackRegister::with_registry(registry),
            event_loop: EventLoop::new(),
        }
    }

    /// Connects both halves to an in-process hub.
    #[must_use]
    pub fn connect(hub: &MemoryHub) -> Self {
        Self::new(hub.publisher(), hub.subscriber())
    }

    /// Ties `prefix` to `handle`: subscribed now, released on close.
    fn track(&self, prefix: String, handle: CallbackHandle) -> CallbackHandle {
        self.subscriptions.borrow_mut().acquire(&prefix);
        let subscriptions = Rc::downgrade(&self.subscriptions);
        handle.on_close(move || {
            if let Some(subscriptions) = subscriptions.upgrade() {
                subscriptions.borrow_mut().release(&prefix);
            }
        })
    }

    /// Inbound prefixes held by live registrations, sorted.
    #[must_use]
    pub fn subscribed_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> =
            self.subscriptions.borrow().counts.keys().cloned().collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Registers for records of type `T`, optionally on one topic only.
    pub fn on<T, F>(&self, topic: Option<&str>, callback: F) -> CallbackHandle
    where
        T: DataType,
        F: Fn(&T, &str) + 'static,
    {
        let handle = self.register.on::<T, F>(topic, callback);
        self.track(subscription_prefix(T::NAME, topic), handle)
    }

    /// Registers for every decoded record.
    pub fn on_any<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&dyn Record, &str) + 'static,
    {
        let handle = self.register.on_any(callback);
        self.track(SUBSCRIBE_ALL.to_string(), handle)
    }

    /// Registers for records whose type has no registration of its own.
    pub fn on_default<F>(&self, topic: Option<&str>, callback: F) -> CallbackHandle
    where
        F: Fn(&dyn Record, &str) + 'static,
    {
        let handle = self.register.on_default(topic, callback);
        self.track(SUBSCRIBE_ALL.to_string(), handle)
    }

    /// Registers for every inbound frame, before decoding.
    pub fn on_raw<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&[u8]) + 'static,
    {
        let handle = self.register.on_raw(callback);
        self.track(SUBSCRIBE_ALL.to_string(), handle)
    }

    /// See [`Publisher::send`].
    ///
    /// # Errors
    ///
    /// See [`Publisher::send`].
    pub fn send<R: Record + ?Sized>(&self, record: &R, topic: &str) -> BusResult<()> {
        self.publisher.send(record, topic)
    }

    /// See [`Publisher::send_raw`].
    ///
    /// # Errors
    ///
    /// See [`Publisher::send_raw`].
    pub fn send_raw(&self, frame: &[u8], more: bool) -> BusResult<()> {
        self.publisher.send_raw(frame, more)
    }

    /// A clonable handle for sending from callbacks and timers.
    #[must_use]
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Timers that run on this bus's poll loop.
    #[must_use]
    pub const fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// The underlying register. Registering through it leaves inbound
    /// subscriptions untouched.
    #[must_use]
    pub const fn callbacks(&self) -> &CallbackRegister {
        &self.register
    }

    fn receive(&self) -> BusResult<Option<Vec<u8>>> {
        Ok(self.subscriptions.borrow_mut().inbound.receive_raw()?)
    }

    fn feed(&self, frame: &[u8]) -> BusResult<()> {
        match self.register.feed(frame) {
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, bytes = frame.len(), "dropping undeliverable frame");
                Ok(())
            }
            other => other,
        }
    }

    /// Feeds every frame available right now; returns how many were fed.
    fn drain(&self) -> BusResult<usize> {
        let mut fed = 0;
        while let Some(frame) = self.receive()? {
            self.feed(&frame)?;
            fed += 1;

            // Remaining frames of the same message.
            while self.subscriptions.borrow().inbound.has_more() {
                let Some(frame) = self.receive()? else {
                    break;
                };
                self.feed(&frame)?;
                fed += 1;
            }
        }
        Ok(fed)
    }

    /// Runs one turn of the loop.
    ///
    /// Fires due timers, waits up to `timeout` (`None` waits until the next
    /// timer, or forever without timers) for inbound frames, dispatches all
    /// frames available, then fires timers that came due meanwhile. Returns
    /// whether any timer fired or any frame was dispatched.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Transport` if the inbound channel fails. Malformed
    /// or undecodable frames are logged and dropped.
    pub fn poll(&self, timeout: Option<Duration>) -> BusResult<bool> {
        let mut worked = self.event_loop.run_due() > 0;

        let wait = if worked {
            Some(Duration::ZERO)
        } else {
            match (timeout, self.event_loop.time_to_next()) {
                (Some(timeout), Some(next)) => Some(timeout.min(next)),
                (timeout, None) => timeout,
                (None, next) => next,
            }
        };

        let readable = self.subscriptions.borrow_mut().inbound.wait_readable(wait)?;
        if readable {
            worked |= self.drain()? > 0;
        }

        worked |= self.event_loop.run_due() > 0;
        Ok(worked)
    }

    /// Polls until nothing is immediately pending.
    ///
    /// # Errors
    ///
    /// See [`Bus::poll`].
    pub fn poll_pending(&self) -> BusResult<()> {
        while self.poll(Some(Duration::ZERO))? {}
        Ok(())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("callbacks", &self.register)
            .field("subscriptions", &self.subscribed_prefixes())
            .field("event_loop", &self.event_loop)
            .finish_non_exhaustive()
    }
}
