//! Typed, synchronous signals.
//!
//! Every observable entity in the kernel (records, record sets, views, list
//! bindings, modals) owns an [`Emitter`] for its own event type. Observers
//! register a callback and receive a [`Subscription`] guard; dropping the
//! guard unregisters the callback.
//!
//! # Invariants
//!
//! 1. Callbacks run synchronously inside [`Emitter::emit`], in registration
//!    order.
//! 2. A callback unsubscribed while an emission is in flight is not called
//!    for the remainder of that emission.
//! 3. Callbacks may subscribe, unsubscribe and emit re-entrantly; a callback
//!    registered during an emission first fires on the next emission.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Slot<E> = Rc<dyn Fn(&E)>;

struct Slots<E> {
    next_id: u64,
    entries: Vec<(u64, Slot<E>)>,
}

impl<E> Slots<E> {
    fn is_live(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }
}

/// A list of observers for events of type `E`.
///
/// Cloning an emitter yields another handle to the same observer list.
pub struct Emitter<E> {
    slots: Rc<RefCell<Slots<E>>>,
}

impl<E: 'static> Emitter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register `callback`; it stays registered until the returned guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Rc::new(callback)));
            id
        };
        let weak: Weak<RefCell<Slots<E>>> = Rc::downgrade(&self.slots);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Deliver `event` to every registered callback.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<(u64, Slot<E>)> = self
            .slots
            .borrow()
            .entries
            .iter()
            .map(|(id, slot)| (*id, Rc::clone(slot)))
            .collect();
        for (id, slot) in snapshot {
            if self.slots.borrow().is_live(id) {
                slot(event);
            }
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.slots.borrow().entries.len()
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.slots.borrow().entries.len())
            .finish()
    }
}

/// RAII guard for a registered callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn cancel(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
