//! Native event source.
//!
//! An `EventDispatcher` holds closures keyed by [`BindingId`]. Bind, unbind
//! and the snapshot taken by `broadcast` are serialized by one lock; the
//! closures themselves run after the lock is released, so a slow handler
//! never blocks binding or firing on the same source.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

/// Key used to attach and detach one closure from a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate an identifier that has never been issued before
    pub fn fresh() -> Self {
        BindingId(NEXT_BINDING.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Multicast event source carrying payloads of type `A`
pub struct EventDispatcher<A> {
    listeners: Mutex<HashMap<BindingId, Listener<A>>>,
}

impl<A> EventDispatcher<A> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<BindingId, Listener<A>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach `listener` under `id`, replacing any listener already bound to it
    pub fn bind<F>(&self, id: BindingId, listener: F)
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.listeners().insert(id, Arc::new(listener));
    }

    /// Detach the listener bound to `id`. Returns whether one was bound.
    pub fn unbind(&self, id: BindingId) -> bool {
        let removed = self.listeners().remove(&id);
        removed.is_some()
    }

    pub fn is_bound(&self, id: BindingId) -> bool {
        self.listeners().contains_key(&id)
    }

    /// Invoke every listener bound at the time of the call.
    ///
    /// Listeners unbound after the snapshot may still receive this event.
    pub fn broadcast(&self, payload: &A) {
        let snapshot: Vec<Listener<A>> = self.listeners().values().cloned().collect();
        for listener in snapshot {
            listener(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Default for EventDispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventDispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.len())
            .finish()
    }
}
