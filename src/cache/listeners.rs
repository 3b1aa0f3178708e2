//! Change listeners registered on a cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;
type Entries<S> = Mutex<Vec<(u64, Callback<S>)>>;

/// Ordered set of callbacks invoked after every successful write.
pub(crate) struct ListenerSet<S> {
    next_id: AtomicU64,
    entries: Arc<Entries<S>>,
}

impl<S: Send + Sync + 'static> ListenerSet<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn add<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        let weak: Weak<Entries<S>> = Arc::downgrade(&self.entries);
        Subscription {
            id,
            remove: Some(Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Calls every listener in registration order.
    ///
    /// The list is copied before the calls so a listener may subscribe or
    /// unsubscribe from inside its callback.
    pub(crate) fn notify(&self, snapshot: &Arc<S>) {
        let callbacks: Vec<Callback<S>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(snapshot);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Removes this listener. Other listeners are unaffected.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Registration id, unique within one cache.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
