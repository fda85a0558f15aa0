//! End-to-end scenarios: auth-driven sessions, the full
//! migrate → hydrate → toggle → stats pipeline, and multi-device sync.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use cdxplore_core::auth::{bind_auth, FakeAuth};
use cdxplore_core::catalog::Catalog;
use cdxplore_core::local::{LegacyStore, MemoryLegacy};
use cdxplore_core::remote::{MemoryRemote, RemoteDocs};
use cdxplore_core::store::VisitedStore;
use cdxplore_core::types::{Continent, CountryCode, StoreState, UserId};

fn uid() -> UserId {
    UserId::new("traveler")
}

fn code(s: &str) -> CountryCode {
    CountryCode::parse(s).unwrap()
}

fn harness() -> (Arc<MemoryRemote>, Arc<MemoryLegacy>, Arc<VisitedStore>) {
    let remote = Arc::new(MemoryRemote::new());
    let legacy = Arc::new(MemoryLegacy::new());
    let store = Arc::new(VisitedStore::with_debounce(
        Arc::clone(&remote) as Arc<dyn RemoteDocs>,
        Arc::clone(&legacy) as Arc<dyn LegacyStore>,
        Duration::from_millis(5),
    ));
    (remote, legacy, store)
}

/// Spin until the store reaches `state` (bind_auth starts sessions on a
/// spawned task, so tests have to yield to it).
async fn wait_for_state(store: &VisitedStore, state: StoreState) {
    for _ in 0..200 {
        if store.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("store never reached {state:?} (still {:?})", store.state());
}

#[tokio::test]
async fn sign_in_starts_a_session_and_sign_out_stops_it() {
    let (remote, _legacy, store) = harness();
    remote.seed(&uid(), json!({ "visited": ["RO"] }));
    let auth = FakeAuth::new();

    let _binding = bind_auth(Arc::clone(&store), &auth);
    assert_eq!(store.state(), StoreState::Unstarted);

    auth.sign_in(uid());
    wait_for_state(&store, StoreState::Ready).await;
    assert!(store.is_visited("RO"));

    auth.sign_out();
    assert_eq!(store.state(), StoreState::Stopped);
    assert!(store.visited().is_empty());
}

#[tokio::test]
async fn sign_out_racing_a_fresh_sign_in_keeps_the_store_stopped() {
    let (remote, _legacy, store) = harness();
    remote.seed(&uid(), json!({ "visited": ["RO"] }));
    let auth = FakeAuth::new();
    let _binding = bind_auth(Arc::clone(&store), &auth);

    // Sign out before the sign-in's spawned start task gets polled; the
    // stale start must not resurrect a session for the signed-out user.
    auth.sign_in(uid());
    auth.sign_out();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ne!(store.state(), StoreState::Ready);
    assert!(store.visited().is_empty());

    // A genuine sign-in afterwards still works.
    auth.sign_in(uid());
    wait_for_state(&store, StoreState::Ready).await;
    assert!(store.is_visited("RO"));
}

#[tokio::test]
async fn already_signed_in_gateway_starts_immediately() {
    let (remote, _legacy, store) = harness();
    remote.seed(&uid(), json!({ "visited": ["JP"] }));
    let auth = FakeAuth::signed_in(uid());

    let _binding = bind_auth(Arc::clone(&store), &auth);
    wait_for_state(&store, StoreState::Ready).await;
    assert!(store.is_visited("JP"));
}

#[tokio::test]
async fn guest_data_follows_the_user_into_their_account() {
    let (remote, legacy, store) = harness();
    legacy.seed([code("RO"), code("FR")]);

    // First sign-in: guest data migrates, gets dated, and the passport
    // reflects it.
    store.start(uid()).await;
    let catalog = Catalog::builtin();
    let stats = store.stats(&catalog);
    assert_eq!(stats.total_visited, 2);
    assert_eq!(stats.continent(Continent::Europe).visited, 2);
    assert_eq!(stats.continents_unlocked(), 1);
    assert!(legacy.is_cleared());

    // A later trip gets stamped too.
    store.toggle("JP");
    store.flush().await;

    let doc = remote.doc(&uid()).unwrap();
    assert_eq!(doc["visited"], json!(["FR", "JP", "RO"]));
    assert_eq!(doc["migratedFromLocal"], json!(true));
    for c in ["RO", "FR", "JP"] {
        assert!(doc["visitedDates"][c].is_string(), "missing date for {c}");
    }

    let stats = store.stats(&catalog);
    assert_eq!(stats.total_visited, 3);
    assert_eq!(stats.progress_percent(), 30);
    assert_eq!(stats.continents_unlocked(), 2);
}

#[tokio::test]
async fn two_devices_converge_through_snapshots() {
    let (remote, _legacy, phone) = harness();
    let laptop = Arc::new(VisitedStore::with_debounce(
        Arc::clone(&remote) as Arc<dyn RemoteDocs>,
        Arc::new(MemoryLegacy::new()) as Arc<dyn LegacyStore>,
        Duration::from_millis(5),
    ));

    phone.start(uid()).await;
    laptop.start(uid()).await;

    phone.toggle("RO");
    phone.flush().await;

    // The laptop's subscription saw the phone's write.
    assert!(laptop.is_visited("RO"));

    laptop.toggle("JP");
    laptop.flush().await;
    assert!(phone.is_visited("JP"));
    assert!(phone.is_visited("RO"));
}

#[tokio::test]
async fn stats_recompute_on_every_mirror_change() {
    let (_remote, _legacy, store) = harness();
    let catalog = Catalog::builtin();
    store.start(uid()).await;

    assert_eq!(store.stats(&catalog).progress_percent(), 0);

    store.set_many(["RO", "AT", "FR", "DE", "IT"], true);
    assert_eq!(store.stats(&catalog).progress_percent(), 50);

    store.toggle("RO");
    assert_eq!(store.stats(&catalog).progress_percent(), 40);
}
