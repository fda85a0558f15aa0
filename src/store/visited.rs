//! VisitedStore — the per-user visited-set state machine.
//!
//! Owns the in-memory mirror of the remote visited document, reconciles it
//! with the backend on session start (including the one-time legacy
//! migration), applies toggles optimistically, and backfills missing visit
//! dates. Public mutating methods never return `Err` — failures are logged
//! and surfaced only through the advisory [`SyncStatus`] signal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::catalog::Catalog;
use crate::local::LegacyStore;
use crate::reactive::{EventEmitter, StoreEvent, Unsubscribe};
use crate::remote::{RemoteDocs, SnapshotCallback};
use crate::stats::PassportStats;
use crate::types::{dates_map, field, visited_array, CountryCode, StoreState, SyncStatus, UserId, VisitedDoc};

use super::coalesce::{StatusSink, WriteCoalescer};

/// Debounce quiet period for coalesced remote writes.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

struct StoreInner {
    state: StoreState,
    uid: Option<UserId>,
    /// Session counter — bumped on every start/stop so callbacks from a
    /// previous session can detect they are stale and bail out.
    epoch: u64,
    visited: BTreeSet<CountryCode>,
    dates: BTreeMap<CountryCode, DateTime<Utc>>,
    /// Dates dropped by toggle-off, kept so a rapid toggle-on within the
    /// session restores the original visit date instead of minting a new one.
    parked_dates: BTreeMap<CountryCode, DateTime<Utc>>,
    backfill_done: bool,
    status: SyncStatus,
    unsubscribe: Option<Unsubscribe>,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            state: StoreState::Unstarted,
            uid: None,
            epoch: 0,
            visited: BTreeSet::new(),
            dates: BTreeMap::new(),
            parked_dates: BTreeMap::new(),
            backfill_done: false,
            status: SyncStatus::Idle,
            unsubscribe: None,
        }
    }
}

/// The visited-countries store.
///
/// Lifecycle per session: `Unstarted → Hydrating → Ready → Stopped` (see
/// [`StoreState`]). `start` is re-entrant; migration is gated strictly on
/// "remote document does not exist", so re-checking it on every start is safe.
pub struct VisitedStore {
    remote: Arc<dyn RemoteDocs>,
    legacy: Arc<dyn LegacyStore>,
    inner: Arc<Mutex<StoreInner>>,
    changes: Arc<EventEmitter<StoreEvent>>,
    statuses: Arc<EventEmitter<SyncStatus>>,
    status_sink: StatusSink,
    coalescer: WriteCoalescer,
}

impl VisitedStore {
    /// Create a store with the default write debounce.
    pub fn new(remote: Arc<dyn RemoteDocs>, legacy: Arc<dyn LegacyStore>) -> Self {
        Self::with_debounce(remote, legacy, DEFAULT_DEBOUNCE)
    }

    /// Create a store with an explicit debounce (tests typically pass zero).
    pub fn with_debounce(
        remote: Arc<dyn RemoteDocs>,
        legacy: Arc<dyn LegacyStore>,
        debounce: Duration,
    ) -> Self {
        let inner = Arc::new(Mutex::new(StoreInner::new()));
        let statuses = Arc::new(EventEmitter::new());

        let status_sink: StatusSink = {
            let inner = Arc::clone(&inner);
            let statuses = Arc::clone(&statuses);
            Arc::new(move |status: SyncStatus| {
                {
                    let mut guard = inner.lock();
                    if guard.status == status {
                        return;
                    }
                    guard.status = status;
                }
                statuses.emit(&status);
            })
        };

        let coalescer =
            WriteCoalescer::new(Arc::clone(&remote), debounce, Arc::clone(&status_sink));

        Self {
            remote,
            legacy,
            inner,
            changes: Arc::new(EventEmitter::new()),
            statuses,
            status_sink,
            coalescer,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start (or restart) a session for `uid`.
    ///
    /// Hydrates from the remote document; if it does not exist, runs the
    /// one-time legacy migration. An existing document wins over legacy data
    /// even when its visited array is empty. A read failure degrades to an
    /// empty mirror with status `Error` rather than blocking.
    pub async fn start(&self, uid: UserId) {
        self.release_session();

        let epoch = {
            let mut inner = self.inner.lock();
            inner.state = StoreState::Hydrating;
            inner.uid = Some(uid.clone());
            inner.visited.clear();
            inner.dates.clear();
            inner.parked_dates.clear();
            inner.backfill_done = false;
            inner.epoch += 1;
            inner.epoch
        };
        self.set_status(SyncStatus::Loading);

        let mut degraded = false;
        match self.remote.read_once(&uid).await {
            Ok(Some(raw)) => {
                // Remote document is authoritative, even if empty.
                let doc = VisitedDoc::from_value(&raw);
                let mut inner = self.inner.lock();
                if inner.epoch != epoch {
                    return;
                }
                inner.visited = doc.visited;
                inner.dates = doc.visited_dates;
            }
            Ok(None) => {
                degraded = !self.migrate_legacy(&uid, epoch).await;
            }
            Err(e) => {
                tracing::warn!(user = %uid, error = %e, "hydration read failed; starting empty");
                degraded = true;
            }
        }

        let unsub = self
            .remote
            .subscribe(&uid, self.snapshot_callback(uid.clone(), epoch));

        let visited_count = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                drop(inner);
                unsub();
                return;
            }
            inner.unsubscribe = Some(unsub);
            inner.state = StoreState::Ready;
            inner.visited.len()
        };

        self.set_status(if degraded {
            SyncStatus::Error
        } else {
            SyncStatus::Idle
        });
        self.changes.emit(&StoreEvent::Hydrated {
            visited: visited_count,
        });

        self.backfill(&uid, epoch).await;
    }

    /// End the session: detach the subscription and clear the mirror.
    ///
    /// Safe to call when not started. In-flight remote writes are not
    /// cancelled — they complete or fail silently against the old session.
    pub fn stop(&self) {
        let unsub = {
            let mut inner = self.inner.lock();
            if inner.state == StoreState::Unstarted {
                return;
            }
            inner.state = StoreState::Stopped;
            inner.uid = None;
            inner.visited.clear();
            inner.dates.clear();
            inner.parked_dates.clear();
            inner.backfill_done = false;
            inner.epoch += 1;
            inner.unsubscribe.take()
        };
        if let Some(unsub) = unsub {
            unsub();
        }
        self.set_status(SyncStatus::Idle);
        self.changes.emit(&StoreEvent::Cleared);
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Toggle one code. Input is case-normalized; unparseable input and
    /// calls outside a Ready session are no-ops.
    ///
    /// The mirror updates synchronously; the remote write is coalesced and
    /// dispatched asynchronously (requires a Tokio runtime). No rollback on
    /// remote failure.
    pub fn toggle(&self, code: &str) {
        let Ok(code) = CountryCode::parse(code) else {
            tracing::debug!(input = code, "ignoring toggle of unparseable code");
            return;
        };

        let dispatch = {
            let mut inner = self.inner.lock();
            if inner.state != StoreState::Ready {
                return;
            }
            let Some(uid) = inner.uid.clone() else {
                return;
            };

            let now_visited = if inner.visited.remove(&code) {
                if let Some(date) = inner.dates.remove(&code) {
                    inner.parked_dates.insert(code.clone(), date);
                }
                false
            } else {
                inner.visited.insert(code.clone());
                let date = inner.parked_dates.remove(&code).unwrap_or_else(Utc::now);
                inner.dates.insert(code.clone(), date);
                true
            };

            (
                uid,
                mirror_fields(&inner.visited, &inner.dates),
                StoreEvent::Toggled {
                    code,
                    visited: now_visited,
                },
            )
        };

        let (uid, fields, event) = dispatch;
        self.coalescer.schedule(uid, fields);
        self.changes.emit(&event);
    }

    /// Bulk mark/unmark. Codes already in the desired state are skipped; if
    /// nothing changes, no remote write is issued.
    pub fn set_many<I, S>(&self, codes: I, visited: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed: Vec<CountryCode> = codes
            .into_iter()
            .filter_map(|s| CountryCode::parse(s.as_ref()).ok())
            .collect();
        if parsed.is_empty() {
            return;
        }

        let dispatch = {
            let mut inner = self.inner.lock();
            if inner.state != StoreState::Ready {
                return;
            }
            let Some(uid) = inner.uid.clone() else {
                return;
            };

            let mut touched = Vec::new();
            for code in parsed {
                if visited {
                    if inner.visited.insert(code.clone()) {
                        let date = inner.parked_dates.remove(&code).unwrap_or_else(Utc::now);
                        inner.dates.insert(code.clone(), date);
                        touched.push(code);
                    }
                } else if inner.visited.remove(&code) {
                    if let Some(date) = inner.dates.remove(&code) {
                        inner.parked_dates.insert(code.clone(), date);
                    }
                    touched.push(code);
                }
            }
            if touched.is_empty() {
                return;
            }

            (
                uid,
                mirror_fields(&inner.visited, &inner.dates),
                StoreEvent::Bulk {
                    codes: touched,
                    visited,
                },
            )
        };

        let (uid, fields, event) = dispatch;
        self.coalescer.schedule(uid, fields);
        self.changes.emit(&event);
    }

    /// Push any coalesced payload immediately (tests and shutdown paths).
    pub async fn flush(&self) {
        self.coalescer.flush().await;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn visited(&self) -> BTreeSet<CountryCode> {
        self.inner.lock().visited.clone()
    }

    pub fn visited_dates(&self) -> BTreeMap<CountryCode, DateTime<Utc>> {
        self.inner.lock().dates.clone()
    }

    /// Membership test with boundary normalization; bad input is `false`.
    pub fn is_visited(&self, code: &str) -> bool {
        CountryCode::parse(code)
            .map(|code| self.inner.lock().visited.contains(&code))
            .unwrap_or(false)
    }

    pub fn state(&self) -> StoreState {
        self.inner.lock().state
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.inner.lock().status
    }

    /// Project passport stats for the current mirror.
    pub fn stats(&self, catalog: &Catalog) -> PassportStats {
        PassportStats::project(catalog, &self.inner.lock().visited)
    }

    /// True while a coalesced write is waiting for the debounce timer.
    pub fn has_pending_write(&self) -> bool {
        self.coalescer.has_pending()
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Observe mirror changes. Fired after hydration, each mutation, each
    /// applied remote snapshot, and on stop.
    pub fn on_change(&self, callback: impl Fn(&StoreEvent) + Send + Sync + 'static) -> Unsubscribe {
        let id = self.changes.on(callback);
        let changes = Arc::clone(&self.changes);
        Box::new(move || changes.off(id))
    }

    /// Observe the advisory sync status (idle/loading/saving/error).
    pub fn on_status(&self, callback: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Unsubscribe {
        let id = self.statuses.on(callback);
        let statuses = Arc::clone(&self.statuses);
        Box::new(move || statuses.off(id))
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Detach the previous session's subscription without emitting events
    /// (used by the re-entrant `start`).
    fn release_session(&self) {
        let unsub = self.inner.lock().unsubscribe.take();
        if let Some(unsub) = unsub {
            unsub();
        }
    }

    fn set_status(&self, status: SyncStatus) {
        (self.status_sink)(status);
    }

    /// One-time legacy migration: runs only when the remote document does
    /// not exist. Returns `false` if the migration write failed (degraded).
    async fn migrate_legacy(&self, uid: &UserId, epoch: u64) -> bool {
        let local = match self.legacy.load() {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(user = %uid, error = %e, "legacy load failed; treating as empty");
                BTreeSet::new()
            }
        };
        if local.is_empty() {
            return true;
        }

        let fields = json!({
            (field::VISITED): visited_array(&local),
            (field::MIGRATED_FROM_LOCAL): true,
        });

        let ok = match self.remote.set_merge(uid, fields).await {
            Ok(()) => {
                // Prevent ghost re-migration on a later start.
                if let Err(e) = self.legacy.clear() {
                    tracing::warn!(user = %uid, error = %e, "failed to clear legacy store after migration");
                }
                true
            }
            Err(e) => {
                // Legacy data stays put so the next start can retry.
                tracing::warn!(user = %uid, error = %e, "migration write failed");
                false
            }
        };

        // Fails open: the mirror adopts the legacy set either way.
        let mut inner = self.inner.lock();
        if inner.epoch == epoch {
            inner.visited = local;
        }
        ok
    }

    /// Assign a date to every visited code lacking one, in one batched merge
    /// write. Runs at most once per session.
    async fn backfill(&self, uid: &UserId, epoch: u64) {
        let payload = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch || inner.backfill_done {
                return;
            }
            let missing: Vec<CountryCode> = inner
                .visited
                .iter()
                .filter(|code| !inner.dates.contains_key(*code))
                .cloned()
                .collect();
            if missing.is_empty() {
                return;
            }
            let now = Utc::now();
            for code in missing {
                inner.dates.insert(code, now);
            }
            inner.backfill_done = true;
            json!({ (field::VISITED_DATES): dates_map(&inner.dates) })
        };

        self.set_status(SyncStatus::Saving);
        match self.remote.set_merge(uid, payload).await {
            Ok(()) => self.set_status(SyncStatus::Idle),
            Err(e) => {
                tracing::warn!(user = %uid, error = %e, "backfill write failed");
                self.set_status(SyncStatus::Error);
            }
        }
    }

    fn snapshot_callback(&self, uid: UserId, epoch: u64) -> SnapshotCallback {
        let inner = Arc::clone(&self.inner);
        let changes = Arc::clone(&self.changes);
        Arc::new(move |snapshot: Option<Value>| {
            let doc = snapshot
                .map(|v| VisitedDoc::from_value(&v))
                .unwrap_or_default();
            let visited_count;
            {
                let mut guard = inner.lock();
                // Ignore snapshots from a stale session or a different user.
                if guard.epoch != epoch || guard.uid.as_ref() != Some(&uid) {
                    return;
                }
                // While Hydrating the one-shot read (or the migration) is the
                // authority; live snapshots only apply once Ready.
                if guard.state != StoreState::Ready {
                    return;
                }
                guard.visited = doc.visited;
                guard.dates = doc.visited_dates;
                visited_count = guard.visited.len();
            }
            changes.emit(&StoreEvent::Remote {
                visited: visited_count,
            });
        })
    }
}

/// Full mirror payload for a merge write: visited array plus the whole dates
/// map. `migratedFromLocal` is deliberately omitted (merge keeps it).
fn mirror_fields(
    visited: &BTreeSet<CountryCode>,
    dates: &BTreeMap<CountryCode, DateTime<Utc>>,
) -> Value {
    VisitedDoc {
        visited: visited.clone(),
        visited_dates: dates.clone(),
        migrated_from_local: false,
        updated_at: None,
    }
    .to_fields()
}
