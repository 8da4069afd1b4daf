#![forbid(unsafe_code)]

//! One-shot "document ready" signal.
//!
//! The host raises [`ReadySignal::fire`] exactly once, when the document tree
//! is fully built. View models that were created earlier subscribe with
//! [`ReadySignal::subscribe`] and activate from the callback.
//!
//! # Invariants
//!
//! 1. Callbacks run at most once, in subscription order.
//! 2. `fire()` after the first call is a no-op.
//! 3. Subscribing after the signal fired runs the callback immediately and
//!    returns no subscription.
//! 4. Dropping a [`ReadySubscription`] before the signal fires removes the
//!    callback.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Waiter = Box<dyn FnOnce()>;

#[derive(Default)]
struct SignalInner {
    fired: bool,
    next_id: u64,
    waiters: Vec<(u64, Waiter)>,
}

/// A one-shot lifecycle signal.
///
/// Cloning a `ReadySignal` creates a new handle to the **same** signal.
#[derive(Clone, Default)]
pub struct ReadySignal {
    inner: Rc<RefCell<SignalInner>>,
}

impl std::fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ReadySignal")
            .field("fired", &inner.fired)
            .field("waiters", &inner.waiters.len())
            .finish()
    }
}

impl ReadySignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that has already fired, for hosts whose tree is complete.
    #[must_use]
    pub fn already_fired() -> Self {
        let signal = Self::new();
        signal.inner.borrow_mut().fired = true;
        signal
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.inner.borrow().fired
    }

    /// Number of callbacks still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().waiters.len()
    }

    /// Run `callback` once the signal fires.
    ///
    /// Returns `None` when the signal has already fired; the callback has
    /// then run before this call returns.
    pub fn subscribe(&self, callback: impl FnOnce() + 'static) -> Option<ReadySubscription> {
        if self.is_fired() {
            callback();
            return None;
        }
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.waiters.push((id, Box::new(callback)));
        Some(ReadySubscription {
            id,
            signal: Rc::downgrade(&self.inner),
        })
    }

    /// Fire the signal. Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            if inner.fired {
                return 0;
            }
            inner.fired = true;
            std::mem::take(&mut inner.waiters)
        };
        let count = waiters.len();
        tracing::debug!(message = "ready.fire", callbacks = count);
        for (_, waiter) in waiters {
            waiter();
        }
        count
    }
}

/// RAII guard for a pending [`ReadySignal`] callback.
pub struct ReadySubscription {
    id: u64,
    signal: Weak<RefCell<SignalInner>>,
}

impl std::fmt::Debug for ReadySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadySubscription")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for ReadySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.signal.upgrade() {
            // The signal may be mid-fire; its waiters were already taken.
            if let Ok(mut inner) = inner.try_borrow_mut() {
                inner.waiters.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
