//! EventEmitter<T> — a small typed pub/sub primitive.
//!
//! Backs the store's `on_change`/`on_status` feeds and the in-memory remote
//! backend's snapshot listeners. Snapshot-on-emit semantics:
//!   - A listener removed *during* emission is still called in that round.
//!   - A listener added *during* emission is NOT called until the next emit.
//!
//! All methods take `&self`; the internal `parking_lot::Mutex` is never held
//! while a callback runs, so listeners may freely call `on()`/`off()` — or
//! re-enter the store — from inside a callback.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies a registered listener; pass to [`EventEmitter::off`] to remove.
pub type ListenerId = u64;

/// Closure type for listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

struct Registry<T> {
    listeners: BTreeMap<ListenerId, Arc<ListenerFn<T>>>,
    next_id: ListenerId,
}

/// Typed synchronous event emitter.
///
/// Ids are handed out monotonically, so the `BTreeMap` keeps listeners in
/// registration order and emission order is deterministic.
pub struct EventEmitter<T> {
    registry: Mutex<Registry<T>>,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                listeners: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Register `callback` and return its [`ListenerId`].
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(callback));
        id
    }

    /// Remove the listener identified by `id`. Safe to call twice.
    pub fn off(&self, id: ListenerId) {
        self.registry.lock().listeners.remove(&id);
    }

    /// Emit `event` to all currently registered listeners.
    ///
    /// A snapshot of the listener map is taken under the lock (cheap Arc
    /// clones), then the lock is dropped before any callback runs.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Arc<ListenerFn<T>>> = {
            let registry = self.registry.lock();
            registry.listeners.values().map(Arc::clone).collect()
        };
        for cb in snapshot {
            cb(event);
        }
    }

    /// Number of currently registered listeners.
    pub fn len(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().listeners.is_empty()
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
