use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Weak;

use super::key::DispatchKey;
use super::{CallbackId, Registrations};

type Release = Box<dyn FnOnce()>;

/// Removes one registration when closed.
///
/// Closing is idempotent. Dropping the handle leaves the callback
/// registered.
pub struct CallbackHandle {
    registrations: Weak<RefCell<Registrations>>,
    key: DispatchKey,
    id: CallbackId,
    closed: Cell<bool>,
    release: RefCell<Option<Release>>,
}

impl CallbackHandle {
    pub(super) fn new(
        registrations: Weak<RefCell<Registrations>>,
        key: DispatchKey,
        id: CallbackId,
    ) -> Self {
        Self {
            registrations,
            key,
            id,
            closed: Cell::new(false),
            release: RefCell::new(None),
        }
    }

    /// Runs `release` once, right after the registration is removed.
    #[must_use]
    pub(crate) fn on_close(self, release: impl FnOnce() + 'static) -> Self {
        *self.release.borrow_mut() = Some(Box::new(release));
        self
    }

    /// The key this callback is registered under.
    #[must_use]
    pub const fn key(&self) -> &DispatchKey {
        &self.key
    }

    /// True once `close` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Removes the callback and prunes its key if it was the last one.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }

        if let Some(registrations) = self.registrations.upgrade() {
            registrations.borrow_mut().remove(&self.key, self.id);
        }

        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("closed", &self.closed.get())
            .field("tracks_subscription", &self.release.borrow().is_some())
            .finish()
    }
}
