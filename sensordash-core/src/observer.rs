//! Observer registry with RAII subscriptions.
//!
//! Callbacks are invoked in registration order and no lock is held while one
//! runs, so an observer may subscribe, unsubscribe, read state or trigger a
//! new notification from inside its own callback. Each delivery carries a
//! revision; an observer never sees a revision older than one it has already
//! seen, which keeps the late-subscribe replay and a concurrent `notify` from
//! reordering.
//!
//! Calls into one observer never overlap. A notification that arrives while
//! the observer is still running, from another thread or from the callback
//! itself, is queued and handed over once the running call returns; when
//! several queue up only the newest is delivered. Observers must not panic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Per-observer delivery bookkeeping.
struct Delivery<T> {
    /// Highest revision accepted, delivered or queued. `None` until the first.
    last: Option<u64>,
    /// A callback for this observer is on some thread's stack.
    running: bool,
    /// Newest value accepted while `running`.
    pending: Option<T>,
}

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
    active: Arc<AtomicBool>,
    delivery: Arc<Mutex<Delivery<T>>>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
            active: self.active.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

impl<T: Clone> Entry<T> {
    fn delivery(&self) -> MutexGuard<'_, Delivery<T>> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deliver `value` unless the observer was removed or already accepted
    /// `revision`. Queues it instead when a call is already in progress.
    fn deliver(&self, revision: u64, value: &T) {
        {
            let mut delivery = self.delivery();
            if delivery.last.is_some_and(|last| last >= revision) || !self.is_active() {
                return;
            }
            delivery.last = Some(revision);
            if delivery.running {
                delivery.pending = Some(value.clone());
                return;
            }
            delivery.running = true;
        }

        (self.callback)(value);

        loop {
            let next = {
                let mut delivery = self.delivery();
                let next = delivery.pending.take().filter(|_| self.is_active());
                if next.is_none() {
                    delivery.running = false;
                }
                next
            };
            match next {
                Some(value) => (self.callback)(&value),
                None => return,
            }
        }
    }
}

struct Entries<T> {
    next_id: u64,
    list: Vec<Entry<T>>,
}

trait RemoveObserver: Send + Sync {
    fn remove(&self, id: u64);
}

struct Shared<T> {
    entries: Mutex<Entries<T>>,
}

impl<T: Send + 'static> RemoveObserver for Shared<T> {
    fn remove(&self, id: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = entries.list.iter().position(|e| e.id == id) {
            let entry = entries.list.remove(pos);
            entry.active.store(false, Ordering::Release);
        }
    }
}

/// Ordered set of callbacks notified with `&T`.
pub struct ObserverRegistry<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(Entries {
                    next_id: 0,
                    list: Vec::new(),
                }),
            }),
        }
    }

    /// Register `callback`. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut entries = self.lock();
        let id = entries.next_id;
        entries.next_id += 1;
        let active = Arc::new(AtomicBool::new(true));
        entries.list.push(Entry {
            id,
            callback: Arc::new(callback),
            active: active.clone(),
            delivery: Arc::new(Mutex::new(Delivery {
                last: None,
                running: false,
                pending: None,
            })),
        });

        let shared: Arc<dyn RemoveObserver> = self.shared.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&shared),
            active,
            detached: false,
        }
    }

    /// Notify every registered observer, in registration order.
    ///
    /// An observer that already accepted `revision` or a later one is skipped.
    pub fn notify(&self, revision: u64, value: &T) {
        let targets: Vec<Entry<T>> = self.lock().list.clone();
        for entry in &targets {
            entry.deliver(revision, value);
        }
    }

    /// Deliver `value` to a single observer, with the same revision gating as
    /// [`notify`](Self::notify).
    pub fn replay(&self, subscription: &Subscription, revision: u64, value: &T) {
        let target = self
            .lock()
            .list
            .iter()
            .find(|e| e.id == subscription.id)
            .cloned();
        if let Some(entry) = target {
            entry.deliver(revision, value);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`ObserverRegistry::subscribe`].
///
/// Dropping it unsubscribes. Use [`detach`](Self::detach) to keep the observer
/// registered for the life of the registry.
#[must_use = "dropping a Subscription unsubscribes the observer immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn RemoveObserver>,
    active: Arc<AtomicBool>,
    detached: bool,
}

impl Subscription {
    /// Remove the observer. Idempotent; a no-op once the registry is gone.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Leave the observer registered after this handle is dropped.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
