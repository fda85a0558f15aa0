//! Toggle and bulk-mutation tests — optimistic mirror updates, boundary
//! normalization, and date parking across rapid toggle-off/toggle-on.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use cdxplore_core::local::{LegacyStore, MemoryLegacy};
use cdxplore_core::reactive::StoreEvent;
use cdxplore_core::remote::{MemoryRemote, RemoteDocs};
use cdxplore_core::store::VisitedStore;
use cdxplore_core::types::{CountryCode, UserId};

fn uid() -> UserId {
    UserId::new("user-1")
}

fn code(s: &str) -> CountryCode {
    CountryCode::parse(s).unwrap()
}

fn harness() -> (Arc<MemoryRemote>, VisitedStore) {
    let remote = Arc::new(MemoryRemote::new());
    let legacy = Arc::new(MemoryLegacy::new());
    let store = VisitedStore::with_debounce(
        Arc::clone(&remote) as Arc<dyn RemoteDocs>,
        legacy as Arc<dyn LegacyStore>,
        Duration::from_millis(5),
    );
    (remote, store)
}

#[tokio::test]
async fn toggle_pair_restores_membership() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    assert!(!store.is_visited("RO"));
    store.toggle("RO");
    store.toggle("RO");
    assert!(!store.is_visited("RO"));

    store.toggle("FR");
    assert!(store.is_visited("FR"));
    store.toggle("FR");
    store.toggle("FR");
    assert!(store.is_visited("FR"));
}

#[tokio::test]
async fn lowercase_input_is_normalized_at_the_boundary() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    store.toggle("ro");
    assert!(store.visited().contains(&code("RO")));
    assert!(store.is_visited("rO"));
}

#[tokio::test]
async fn unparseable_input_is_a_noop() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    store.toggle("R0MANIA");
    store.toggle("");
    assert!(store.visited().is_empty());
}

#[tokio::test]
async fn toggle_before_start_is_a_noop() {
    let (remote, store) = harness();

    store.toggle("RO");
    assert!(store.visited().is_empty());
    assert!(!remote.exists(&uid()));
}

#[tokio::test]
async fn toggle_assigns_a_date_and_removal_drops_it() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    store.toggle("RO");
    assert!(store.visited_dates().contains_key(&code("RO")));

    store.toggle("RO");
    assert!(!store.visited_dates().contains_key(&code("RO")));
}

#[tokio::test]
async fn rapid_retoggle_keeps_the_original_visit_date() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    store.toggle("RO");
    let original = store.visited_dates()[&code("RO")];

    store.toggle("RO");
    store.toggle("RO");
    assert_eq!(store.visited_dates()[&code("RO")], original);
}

#[tokio::test]
async fn mirror_updates_before_the_remote_write() {
    let (remote, store) = harness();
    store.start(uid()).await;

    store.toggle("RO");
    // Optimistic: visible locally, not yet persisted.
    assert!(store.is_visited("RO"));
    assert!(store.has_pending_write());

    store.flush().await;
    let doc = remote.doc(&uid()).unwrap();
    assert_eq!(doc["visited"], json!(["RO"]));
    assert!(doc["visitedDates"]["RO"].is_string());
}

#[tokio::test]
async fn write_failure_is_swallowed_and_mirror_keeps_the_change() {
    let (remote, store) = harness();
    store.start(uid()).await;
    remote.fail_writes(true);

    store.toggle("RO");
    store.flush().await;

    // No rollback — the toggle survives locally.
    assert!(store.is_visited("RO"));
    assert!(!remote.exists(&uid()));
}

#[tokio::test]
async fn set_many_skips_codes_already_in_the_desired_state() {
    let (_remote, store) = harness();
    store.start(uid()).await;
    store.toggle("RO");
    store.flush().await;

    let events: Arc<Mutex<Vec<StoreEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _unsub = store.on_change(move |e| sink.lock().push(e.clone()));

    store.set_many(["RO", "FR", "jp"], true);

    assert!(store.is_visited("RO"));
    assert!(store.is_visited("FR"));
    assert!(store.is_visited("JP"));
    // RO was already visited, so the bulk event names only FR and JP.
    let recorded = events.lock();
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        recorded[0],
        StoreEvent::Bulk {
            codes: vec![code("FR"), code("JP")],
            visited: true,
        }
    );
}

#[tokio::test]
async fn set_many_with_no_effective_change_writes_nothing() {
    let (_remote, store) = harness();
    store.start(uid()).await;
    store.toggle("RO");
    store.flush().await;
    assert!(!store.has_pending_write());

    store.set_many(["RO"], true);
    store.set_many(["FR", "JP"], false);

    assert!(!store.has_pending_write());
}

#[tokio::test]
async fn set_many_unmark_parks_dates_for_later_remark() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    store.set_many(["RO", "FR"], true);
    let original = store.visited_dates()[&code("RO")];

    store.set_many(["RO", "FR"], false);
    assert!(store.visited_dates().is_empty());

    store.set_many(["RO"], true);
    assert_eq!(store.visited_dates()[&code("RO")], original);
}

#[tokio::test]
async fn toggle_emits_change_events_in_call_order() {
    let (_remote, store) = harness();
    store.start(uid()).await;

    let events: Arc<Mutex<Vec<StoreEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _unsub = store.on_change(move |e| sink.lock().push(e.clone()));

    store.toggle("RO");
    store.toggle("FR");
    store.toggle("RO");

    let recorded = events.lock();
    assert_eq!(
        recorded.as_slice(),
        &[
            StoreEvent::Toggled { code: code("RO"), visited: true },
            StoreEvent::Toggled { code: code("FR"), visited: true },
            StoreEvent::Toggled { code: code("RO"), visited: false },
        ]
    );
}
