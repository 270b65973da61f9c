//! One-shot and repeating timers driven by the bus poll loop.
//!
//! Timers never fire on their own: [`EventLoop::run_due`] runs whatever is
//! due, and [`EventLoop::next_deadline`] tells the poller how long it may
//! sleep.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

type TimerCallback = Rc<RefCell<dyn FnMut()>>;

struct Timer {
    due: Instant,
    interval: Option<Duration>,
    callback: TimerCallback,
}

#[derive(Default)]
struct Timers {
    entries: BTreeMap<u64, Timer>,
    next_id: u64,
}

/// Single-threaded timer scheduler.
#[derive(Clone, Default)]
pub struct EventLoop {
    timers: Rc<RefCell<Timers>>,
}

impl EventLoop {
    /// An event loop with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn schedule(
        &self,
        delay: Duration,
        interval: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let mut timers = self.timers.borrow_mut();
        let id = timers.next_id;
        timers.next_id += 1;
        timers.entries.insert(
            id,
            Timer {
                due: Instant::now() + delay,
                interval,
                callback,
            },
        );
        TimerHandle {
            timers: Rc::downgrade(&self.timers),
            id,
        }
    }

    /// Runs `callback` once, `delay` from now.
    pub fn after<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnMut() + 'static,
    {
        self.schedule(delay, None, Rc::new(RefCell::new(callback)))
    }

    /// Runs `callback` every `interval`, starting one interval from now.
    pub fn every<F>(&self, interval: Duration, callback: F) -> TimerHandle
    where
        F: FnMut() + 'static,
    {
        self.schedule(interval, Some(interval), Rc::new(RefCell::new(callback)))
    }

    /// Earliest pending due time.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.borrow().entries.values().map(|t| t.due).min()
    }

    /// Time until the earliest pending due time, zero if already due.
    #[must_use]
    pub fn time_to_next(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|due| due.saturating_duration_since(Instant::now()))
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.borrow().entries.len()
    }

    /// True if no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.borrow().entries.is_empty()
    }

    /// Fires every timer due by now, each at most once, earliest first.
    ///
    /// Repeating timers are rescheduled one interval after their due time,
    /// or one interval from now if they fell behind. Returns how many
    /// callbacks ran.
    pub fn run_due(&self) -> usize {
        let now = Instant::now();
        let mut due: Vec<(Instant, u64)> = self
            .timers
            .borrow()
            .entries
            .iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(id, t)| (t.due, *id))
            .collect();
        due.sort_unstable();

        let mut fired = 0;
        for (_, id) in due {
            let callback = {
                let mut timers = self.timers.borrow_mut();
                // Stopped by an earlier callback in this round.
                let Some(timer) = timers.entries.get_mut(&id) else {
                    continue;
                };
                let callback = Rc::clone(&timer.callback);
                let interval = timer.interval;
                match interval {
                    Some(interval) => {
                        let next = timer.due + interval;
                        timer.due = if next > now { next } else { now + interval };
                    }
                    None => {
                        timers.entries.remove(&id);
                    }
                }
                callback
            };

            // A callback already running further up the stack is skipped.
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            (*callback)();
            fired += 1;
        }
        fired
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("timers", &self.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Cancels a scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    timers: Weak<RefCell<Timers>>,
    id: u64,
}

impl TimerHandle {
    /// Cancels the timer. Stopping twice, or after a one-shot timer fired,
    /// does nothing.
    pub fn stop(&self) {
        if let Some(timers) = self.timers.upgrade() {
            timers.borrow_mut().entries.remove(&self.id);
        }
    }

    /// True while the timer is still scheduled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timers
            .upgrade()
            .is_some_and(|timers| timers.borrow().entries.contains_key(&self.id))
    }
}
