// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronous change notification with deferred subscription changes.
//!
//! Dispatch iterates a snapshot of the subscribers taken when the event
//! starts. Subscribing or unsubscribing from inside a listener is queued
//! until the dispatch finishes, so a listener removed mid-dispatch still
//! receives the in-flight event if it had not been reached yet, and a
//! listener added mid-dispatch only sees later events. Events emitted from
//! inside a listener are queued and delivered once the current one is done.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Handle identifying a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random subscription ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

enum PendingChange<E> {
    Subscribe(SubscriptionId, Listener<E>),
    Unsubscribe(SubscriptionId),
}

struct BusInner<E> {
    listeners: RefCell<Vec<(SubscriptionId, Listener<E>)>>,
    pending: RefCell<Vec<PendingChange<E>>>,
    queued: RefCell<VecDeque<E>>,
    dispatching: Cell<bool>,
}

/// Observer list shared between a publisher and its listeners.
///
/// Cloning yields another handle to the same list, which listeners can
/// capture to unsubscribe themselves.
pub struct EventBus<E> {
    inner: Rc<BusInner<E>>,
}

impl<E> EventBus<E> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                listeners: RefCell::new(Vec::new()),
                pending: RefCell::new(Vec::new()),
                queued: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// Register a listener
    pub fn subscribe(&self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId::new();
        let listener: Listener<E> = Rc::new(RefCell::new(listener));
        if self.inner.dispatching.get() {
            self.inner
                .pending
                .borrow_mut()
                .push(PendingChange::Subscribe(id, listener));
        } else {
            self.inner.listeners.borrow_mut().push((id, listener));
        }
        id
    }

    /// Remove a listener. Unknown IDs are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.inner.dispatching.get() {
            self.inner
                .pending
                .borrow_mut()
                .push(PendingChange::Unsubscribe(id));
        } else {
            self.inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
        }
    }

    /// Number of active listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Whether an event is currently being delivered
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    /// Deliver an event to every listener
    pub fn emit(&self, event: E) {
        if self.inner.dispatching.get() {
            self.inner.queued.borrow_mut().push_back(event);
            return;
        }

        self.inner.dispatching.set(true);
        let _guard = DispatchGuard { inner: &self.inner };
        let mut next = Some(event);
        while let Some(event) = next {
            let snapshot: Vec<Listener<E>> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in snapshot {
                (&mut *listener.borrow_mut())(&event);
            }
            self.inner.apply_pending();
            next = self.inner.queued.borrow_mut().pop_front();
        }
    }
}

impl<E> BusInner<E> {
    fn apply_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut listeners = self.listeners.borrow_mut();
        for change in pending {
            match change {
                PendingChange::Subscribe(id, listener) => listeners.push((id, listener)),
                PendingChange::Unsubscribe(id) => listeners.retain(|(lid, _)| *lid != id),
            }
        }
    }
}

/// Ends a dispatch even when a listener panics. Subscription changes made
/// before the panic are kept; events still queued are dropped.
struct DispatchGuard<'a, E> {
    inner: &'a BusInner<E>,
}

impl<E> Drop for DispatchGuard<'_, E> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.apply_pending();
            self.inner.queued.borrow_mut().clear();
        }
        self.inner.dispatching.set(false);
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_panicking_listener_does_not_wedge_bus() {
        let bus = EventBus::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(move |e: &u32| {
            assert_ne!(*e, 13, "unlucky event");
            sink.borrow_mut().push(*e);
        });

        let result = catch_unwind(AssertUnwindSafe(|| bus.emit(13)));
        assert!(result.is_err());
        assert!(!bus.is_dispatching());

        bus.emit(1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_delivers_in_subscription_order() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |e: &u32| log.borrow_mut().push(format!("{tag}{e}")));
        }
        bus.emit(1);
        assert_eq!(*log.borrow(), vec!["a1", "b1"]);
    }

    #[test]
    fn test_unsubscribe_outside_dispatch() {
        let bus = EventBus::<u32>::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| c.set(c.get() + 1));
        bus.emit(0);
        bus.unsubscribe(id);
        bus.emit(0);
        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_removed_mid_dispatch_still_receives_in_flight_event() {
        let bus = EventBus::<u32>::new();
        let second_hits = Rc::new(Cell::new(0));
        let second_id = Rc::new(Cell::new(None));

        let handle = bus.clone();
        let target = Rc::clone(&second_id);
        bus.subscribe(move |_| {
            if let Some(id) = target.get() {
                handle.unsubscribe(id);
            }
        });
        let hits = Rc::clone(&second_hits);
        second_id.set(Some(bus.subscribe(move |_| hits.set(hits.get() + 1))));

        bus.emit(1);
        assert_eq!(second_hits.get(), 1);
        bus.emit(2);
        assert_eq!(second_hits.get(), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_added_mid_dispatch_waits_for_next_event() {
        let bus = EventBus::<u32>::new();
        let late_hits = Rc::new(RefCell::new(Vec::new()));
        let added = Rc::new(Cell::new(false));

        let handle = bus.clone();
        let hits = Rc::clone(&late_hits);
        let flag = Rc::clone(&added);
        bus.subscribe(move |_| {
            if !flag.get() {
                flag.set(true);
                let hits = Rc::clone(&hits);
                handle.subscribe(move |e: &u32| hits.borrow_mut().push(*e));
            }
        });

        bus.emit(1);
        assert!(late_hits.borrow().is_empty());
        bus.emit(2);
        assert_eq!(*late_hits.borrow(), vec![2]);
    }

    #[test]
    fn test_nested_emit_is_queued() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let handle = bus.clone();
        let l = Rc::clone(&log);
        bus.subscribe(move |e: &u32| {
            l.borrow_mut().push(format!("first {e}"));
            if *e == 1 {
                handle.emit(2);
            }
        });
        let l = Rc::clone(&log);
        bus.subscribe(move |e: &u32| l.borrow_mut().push(format!("second {e}")));

        bus.emit(1);
        assert_eq!(
            *log.borrow(),
            vec!["first 1", "second 1", "first 2", "second 2"]
        );
        assert!(!bus.is_dispatching());
    }
}
