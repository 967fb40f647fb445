//! Type-erased, reference-counted handle registry.
//!
//! Native objects are registered behind an opaque [`Handle`] that the
//! caller can hold without ever seeing native memory. Each entry keeps the
//! payload's `TypeId`, so a token presented with the wrong type resolves to
//! `None` instead of being reinterpreted.
//!
//! # Invariants
//!
//! - A handle resolves iff it is currently registered. Unknown, released or
//!   zero tokens always degrade to "not found" (`None`, `false`, `0`).
//! - Reference counts start at 1; the entry is destroyed exactly on the
//!   1 → 0 transition. Count changes and removal happen under the registry
//!   lock, so a release can never race a lookup into a freed entry.
//! - Tokens are never reused within a process.

use crate::token;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Opaque, address-sized token naming one registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// Interpret a raw boundary value. Null yields `None`.
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(Handle)
    }

    /// Boundary representation of this token
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn as_usize(self) -> usize {
        self.0.get()
    }

    pub(crate) fn fresh() -> Self {
        Handle(token::next_token())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    ref_count: AtomicI32,
}

/// Thread-safe registry mapping handles to native objects
pub struct HandleRegistry {
    entries: Mutex<HashMap<Handle, Entry>>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide registry used by the C surface
    pub fn global() -> &'static HandleRegistry {
        static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();
        REGISTRY.get_or_init(HandleRegistry::new)
    }

    // Every mutation is a single map operation, so a poisoned map is still consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<Handle, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of `value` and return a fresh handle with a count of 1
    pub fn register<T: Any + Send + Sync>(&self, value: T) -> Handle {
        self.register_shared(Arc::new(value))
    }

    /// Register shared ownership of an existing native object.
    ///
    /// Registering the same `Arc` twice yields two independent handles.
    pub fn register_shared<T: Any + Send + Sync>(&self, value: Arc<T>) -> Handle {
        let handle = Handle::fresh();
        let entry = Entry {
            value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            ref_count: AtomicI32::new(1),
        };
        self.entries().insert(handle, entry);
        tracing::trace!(%handle, type_name = type_name::<T>(), "handle.register");
        handle
    }

    /// Resolve `handle` to its object if it is registered as a `T`
    pub fn resolve<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        let value = {
            let entries = self.entries();
            let entry = entries.get(&handle)?;
            if entry.type_id != TypeId::of::<T>() {
                return None;
            }
            Arc::clone(&entry.value)
        };
        value.downcast::<T>().ok()
    }

    /// True iff `handle` is currently registered, regardless of type
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.entries().contains_key(&handle)
    }

    /// Type name recorded at registration
    pub fn type_name(&self, handle: Handle) -> Option<&'static str> {
        self.entries().get(&handle).map(|e| e.type_name)
    }

    /// Increment the count. Returns `false` if the handle is not registered
    /// or its count is already at `i32::MAX`.
    pub fn retain(&self, handle: Handle) -> bool {
        let entries = self.entries();
        let Some(entry) = entries.get(&handle) else {
            return false;
        };
        let retained = entry
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .is_ok();
        if !retained {
            tracing::warn!(%handle, "handle.retain: reference count saturated");
        }
        retained
    }

    /// Decrement the count; destroy the entry when it reaches zero.
    ///
    /// Returns `true` only when this call destroyed the entry.
    pub fn release(&self, handle: Handle) -> bool {
        let removed = {
            let mut entries = self.entries();
            let Some(entry) = entries.get(&handle) else {
                return false;
            };
            if entry.ref_count.fetch_sub(1, Ordering::AcqRel) != 1 {
                return false;
            }
            entries.remove(&handle)
        };
        // Payload destructors run outside the lock.
        drop(removed);
        tracing::trace!(%handle, "handle.destroy");
        true
    }

    /// Current count, or 0 if not registered
    pub fn ref_count(&self, handle: Handle) -> i32 {
        self.entries()
            .get(&handle)
            .map(|e| e.ref_count.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, invalidating all outstanding handles
    pub fn clear(&self) {
        let drained: Vec<Entry> = self.entries().drain().map(|(_, e)| e).collect();
        drop(drained);
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.len())
            .finish()
    }
}
