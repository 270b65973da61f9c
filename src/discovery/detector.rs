use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::Bus;
use crate::config::DiscoveryConfig;
use crate::data_types::{Discover, Hello};
use crate::dispatch::CallbackHandle;
use crate::error::{BusResult, DiscoveryError};
use crate::event_loop::TimerHandle;

/// Where a detector is in its discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryState {
    /// Created, no probe sent yet.
    Idle,
    /// Probes out, waiting for a `Hello`.
    Probing,
    /// A `Hello` arrived.
    Ready,
    /// The deadline passed without a reply.
    TimedOut,
}

/// Stops the probe and deadline timers on every exit path.
struct TimerGuard {
    timers: [TimerHandle; 2],
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        for timer in &self.timers {
            timer.stop();
        }
    }
}

/// Finds a responder on the bus.
///
/// Replies are expected on a probe topic unique to this detector, so
/// several detectors can share a bus.
#[derive(Debug)]
pub struct BusDetector {
    program_id: String,
    probe_topic: String,
    probe: Discover,
    state: Rc<Cell<DiscoveryState>>,
    reply: Rc<RefCell<Option<Hello>>>,
    handle: CallbackHandle,
}

impl BusDetector {
    /// Creates a detector probing for any host and program.
    pub fn new(program_id: impl Into<String>, bus: &Bus) -> Self {
        Self::with_probe(program_id, bus, Discover::any())
    }

    /// Creates a detector sending `probe`.
    pub fn with_probe(program_id: impl Into<String>, bus: &Bus, probe: Discover) -> Self {
        let program_id = program_id.into();
        let probe_topic = format!("{program_id}:probe:{}", Uuid::new_v4().simple());
        let state = Rc::new(Cell::new(DiscoveryState::Idle));
        let reply = Rc::new(RefCell::new(None));

        let s = Rc::clone(&state);
        let r = Rc::clone(&reply);
        let handle = bus.on::<Hello, _>(Some(&probe_topic), move |hello, _| {
            if s.get() == DiscoveryState::Probing {
                *r.borrow_mut() = Some(hello.clone());
            }
        });

        Self {
            program_id,
            probe_topic,
            probe,
            state,
            reply,
            handle,
        }
    }

    /// Program id the probe topic is derived from.
    #[must_use]
    pub fn program_id(&self) -> &str {
        &self.program_id
    }

    /// Topic probes are sent on and replies are expected on.
    #[must_use]
    pub fn probe_topic(&self) -> &str {
        &self.probe_topic
    }

    /// Probe this detector sends.
    #[must_use]
    pub fn probe(&self) -> &Discover {
        &self.probe
    }

    /// Current state of the discovery run.
    #[must_use]
    pub fn state(&self) -> DiscoveryState {
        self.state.get()
    }

    /// Probes until a `Hello` arrives or `config.timeout` elapses.
    ///
    /// The first probe goes out immediately, then one every
    /// `config.probe_interval`. Both timers are stopped before returning.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Discovery(NoBus)` on timeout, or any transport
    /// or serialization error raised while probing.
    pub fn discover(&self, bus: &Bus, config: &DiscoveryConfig) -> BusResult<Hello> {
        self.reply.borrow_mut().take();
        self.state.set(DiscoveryState::Probing);

        let result = self.run(bus, config);
        self.state.set(match &result {
            Ok(_) => DiscoveryState::Ready,
            Err(err) if err.is_timeout() => DiscoveryState::TimedOut,
            Err(_) => DiscoveryState::Idle,
        });
        result
    }

    fn run(&self, bus: &Bus, config: &DiscoveryConfig) -> BusResult<Hello> {
        let timed_out = Rc::new(Cell::new(false));

        let publisher = bus.publisher();
        let probe = self.probe.clone();
        let topic = self.probe_topic.clone();
        let repeat = bus.event_loop().every(config.probe_interval, move || {
            debug!(probe = %probe, topic = %topic, "sending discovery probe");
            if let Err(err) = publisher.send(&probe, &topic) {
                warn!(error = %err, "failed to send discovery probe");
            }
        });
        let t = Rc::clone(&timed_out);
        let deadline = bus.event_loop().after(config.timeout, move || t.set(true));
        let _guard = TimerGuard {
            timers: [repeat, deadline],
        };

        debug!(probe = %self.probe, topic = %self.probe_topic, "sending discovery probe");
        bus.send(&self.probe, &self.probe_topic)?;

        loop {
            if let Some(hello) = self.reply.borrow_mut().take() {
                debug!(hello = %hello, "bus discovered");
                return Ok(hello);
            }
            if timed_out.get() {
                return Err(DiscoveryError::NoBus {
                    timeout_ms: config.timeout_ms(),
                }
                .into());
            }
            bus.poll(None)?;
        }
    }
}

impl Drop for BusDetector {
    fn drop(&mut self) {
        self.handle.close();
    }
}
