//! WriteCoalescer — debounce layer over the remote merge writes.
//!
//! Rapid local mutations each schedule the mirror's *latest* full payload;
//! one timer per store fires after a short quiet period and writes only the
//! newest pending payload. Best-effort throughput, not correctness: the
//! mirror's newest state always reaches the backend eventually.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::RemoteError;
use crate::remote::RemoteDocs;
use crate::types::{SyncStatus, UserId};

/// Sink the coalescer reports write progress through (Saving/Idle/Error).
pub type StatusSink = Arc<dyn Fn(SyncStatus) + Send + Sync>;

struct Slot {
    pending: Option<(UserId, Value)>,
    /// A drain task is running (sleeping or writing).
    armed: bool,
    disposed: bool,
}

/// Coalesces merge writes behind a single debounce timer.
pub struct WriteCoalescer {
    remote: Arc<dyn RemoteDocs>,
    debounce: Duration,
    slot: Arc<Mutex<Slot>>,
    on_status: StatusSink,
}

impl WriteCoalescer {
    pub fn new(remote: Arc<dyn RemoteDocs>, debounce: Duration, on_status: StatusSink) -> Self {
        Self {
            remote,
            debounce,
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                armed: false,
                disposed: false,
            })),
            on_status,
        }
    }

    /// Replace any pending payload with `fields` and arm the timer.
    ///
    /// Must be called from within a Tokio runtime — the drain task is spawned
    /// here. Later calls before the timer fires simply supersede the payload.
    pub fn schedule(&self, uid: UserId, fields: Value) {
        {
            let mut slot = self.slot.lock();
            if slot.disposed {
                return;
            }
            slot.pending = Some((uid, fields));
            if slot.armed {
                return;
            }
            slot.armed = true;
        }

        let remote = Arc::clone(&self.remote);
        let slot = Arc::clone(&self.slot);
        let on_status = Arc::clone(&self.on_status);
        let debounce = self.debounce;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(debounce).await;

                let taken = {
                    let mut guard = slot.lock();
                    if guard.disposed {
                        guard.armed = false;
                        break;
                    }
                    match guard.pending.take() {
                        Some(pair) => pair,
                        None => {
                            guard.armed = false;
                            break;
                        }
                    }
                };

                write_payload(&*remote, &on_status, taken).await;
                // New payloads scheduled during the write are drained by the
                // next loop iteration (after another quiet period).
            }
        });
    }

    /// Write any pending payload immediately, bypassing the timer.
    pub async fn flush(&self) {
        let taken = self.slot.lock().pending.take();
        if let Some(pair) = taken {
            write_payload(&*self.remote, &self.on_status, pair).await;
        }
    }

    /// True if a payload is waiting for the timer.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Drop pending work and refuse future schedules.
    pub fn dispose(&self) {
        let mut slot = self.slot.lock();
        slot.disposed = true;
        slot.pending = None;
    }
}

async fn write_payload(
    remote: &dyn RemoteDocs,
    on_status: &StatusSink,
    (uid, fields): (UserId, Value),
) {
    on_status(SyncStatus::Saving);
    match remote.set_merge(&uid, fields).await {
        Ok(()) => on_status(SyncStatus::Idle),
        Err(e) => {
            warn_write_failed(&uid, &e);
            on_status(SyncStatus::Error);
        }
    }
}

fn warn_write_failed(uid: &UserId, e: &RemoteError) {
    tracing::warn!(user = %uid, error = %e, "coalesced remote write failed");
}
