//! MemoryRemote — an in-process `RemoteDocs` backend.
//!
//! Documents live in a `parking_lot::Mutex` map; each user gets an
//! `EventEmitter` whose listeners fire synchronously after every write.
//! Failure injection (`fail_reads` / `fail_writes`) lets tests exercise the
//! store's degraded paths without a network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::RemoteError;
use crate::reactive::{EventEmitter, Unsubscribe};
use crate::remote::docs::{RemoteDocs, SnapshotCallback};
use crate::types::{field, UserId};

#[derive(Default)]
struct MemoryRemoteInner {
    docs: HashMap<UserId, Value>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory per-user document store with snapshot listeners.
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<MemoryRemoteInner>,
    emitters: Mutex<HashMap<UserId, Arc<EventEmitter<Option<Value>>>>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `read_once` calls fail (until called with `false`).
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Make subsequent `set_merge` calls fail (until called with `false`).
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Current document for `uid`, if any. Test/inspection helper.
    pub fn doc(&self, uid: &UserId) -> Option<Value> {
        self.inner.lock().docs.get(uid).cloned()
    }

    /// Whether a document exists for `uid`.
    pub fn exists(&self, uid: &UserId) -> bool {
        self.inner.lock().docs.contains_key(uid)
    }

    /// Seed a raw document directly, bypassing merge semantics and listeners.
    pub fn seed(&self, uid: &UserId, doc: Value) {
        self.inner.lock().docs.insert(uid.clone(), doc);
    }

    fn emitter_for(&self, uid: &UserId) -> Arc<EventEmitter<Option<Value>>> {
        let mut emitters = self.emitters.lock();
        Arc::clone(
            emitters
                .entry(uid.clone())
                .or_insert_with(|| Arc::new(EventEmitter::new())),
        )
    }

    fn notify(&self, uid: &UserId) {
        // Snapshot the doc first; listeners run with no lock held.
        let snapshot = self.inner.lock().docs.get(uid).cloned();
        self.emitter_for(uid).emit(&snapshot);
    }
}

#[async_trait]
impl RemoteDocs for MemoryRemote {
    async fn read_once(&self, uid: &UserId) -> Result<Option<Value>, RemoteError> {
        let inner = self.inner.lock();
        if inner.fail_reads {
            return Err(RemoteError::Transport("injected read failure".to_string()));
        }
        Ok(inner.docs.get(uid).cloned())
    }

    async fn set_merge(&self, uid: &UserId, fields: Value) -> Result<(), RemoteError> {
        {
            let mut inner = self.inner.lock();
            if inner.fail_writes {
                return Err(RemoteError::Transport(
                    "injected write failure".to_string(),
                ));
            }

            let doc = inner
                .docs
                .entry(uid.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !doc.is_object() {
                *doc = Value::Object(Map::new());
            }
            if let (Some(target), Some(incoming)) = (doc.as_object_mut(), fields.as_object()) {
                for (key, value) in incoming {
                    target.insert(key.clone(), value.clone());
                }
                target.insert(
                    field::UPDATED_AT.to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
            }
        }
        self.notify(uid);
        Ok(())
    }

    fn subscribe(&self, uid: &UserId, callback: SnapshotCallback) -> Unsubscribe {
        let emitter = self.emitter_for(uid);
        let cb = Arc::clone(&callback);
        let id = emitter.on(move |snapshot: &Option<Value>| cb(snapshot.clone()));

        // Initial delivery: the current state, synchronously on registration.
        callback(self.inner.lock().docs.get(uid).cloned());

        Box::new(move || emitter.off(id))
    }
}
