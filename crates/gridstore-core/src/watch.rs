//! Watcher hub: the change-notification primitive shared by every store
//!
//! A [`WatcherHub`] is a payload-agnostic callback registry. Registration
//! hands back a [`WatcherHandle`]; dispatch runs synchronously, in
//! registration order, against a snapshot of the callback list so a callback
//! may register or unregister watchers (including itself) without affecting
//! the in-flight dispatch.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Callback type stored in a hub
type Watcher<E> = Rc<dyn Fn(&E)>;

struct HubInner<E> {
    next_id: u64,
    watchers: Vec<(u64, Watcher<E>)>,
}

/// Synchronous publish/subscribe hub for one event type
pub struct WatcherHub<E> {
    inner: Rc<RefCell<HubInner<E>>>,
}

impl<E> WatcherHub<E> {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(HubInner {
                next_id: 1,
                watchers: Vec::new(),
            })),
        }
    }

    /// Register a callback, returning the handle that unregisters it
    pub fn register(&self, watcher: impl Fn(&E) + 'static) -> WatcherHandle<E> {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.watchers.push((id, Rc::new(watcher)));
        WatcherHandle {
            hub: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver an event to every currently registered callback.
    ///
    /// The callback list is snapshotted before the first invocation, so
    /// reentrant register/unregister calls take effect only for later
    /// dispatches.
    pub fn accept(&self, event: &E) {
        let snapshot: Vec<Watcher<E>> = self
            .inner
            .borrow()
            .watchers
            .iter()
            .map(|(_, w)| Rc::clone(w))
            .collect();

        log::trace!("dispatching event to {} watcher(s)", snapshot.len());
        for watcher in snapshot {
            watcher(event);
        }
    }

    /// Number of registered watchers
    pub fn len(&self) -> usize {
        self.inner.borrow().watchers.len()
    }

    /// True if no watcher is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> std::fmt::Debug for WatcherHub<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHub")
            .field("watchers", &self.len())
            .finish()
    }
}

impl<E> Default for WatcherHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for WatcherHub<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Unregistration token for one registered callback.
///
/// Holds only a weak link to the hub: dropping the handle without calling
/// [`unregister`](WatcherHandle::unregister) leaves the watcher active, and a
/// handle outliving its hub is harmless.
pub struct WatcherHandle<E> {
    hub: Weak<RefCell<HubInner<E>>>,
    id: u64,
}

impl<E> WatcherHandle<E> {
    /// Remove the callback from its hub. Idempotent; a no-op once the hub is
    /// gone or the callback was already removed.
    pub fn unregister(&self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.borrow_mut().watchers.retain(|(id, _)| *id != self.id);
        }
    }

    /// True while the callback is still registered
    pub fn is_registered(&self) -> bool {
        self.hub
            .upgrade()
            .map(|inner| inner.borrow().watchers.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}
