//! Auth gateway — the identity seam.
//!
//! The real identity provider lives outside this crate; [`AuthGateway`] is
//! the narrow capability the store needs: current identity plus a change
//! feed. [`bind_auth`] wires auth transitions to the store's lifecycle so a
//! sign-in starts a session and a sign-out stops it. [`FakeAuth`] is the
//! deterministic in-process implementation for tests and harnesses.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reactive::{EventEmitter, Unsubscribe};
use crate::store::VisitedStore;
use crate::types::UserId;

/// Auth state listener: `Some(uid)` on sign-in, `None` on sign-out.
pub type AuthCallback = Arc<dyn Fn(Option<UserId>) + Send + Sync>;

/// Identity-provider capability.
///
/// `on_auth_state` fires once promptly after registration with the resolved
/// state, then on every subsequent sign-in/out, until unsubscribed.
pub trait AuthGateway: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
    fn on_auth_state(&self, callback: AuthCallback) -> Unsubscribe;
}

/// Drive a store from an auth gateway: identity resolved ⇒ `start(uid)`
/// (spawned — requires a Tokio runtime), identity gone ⇒ `stop()`.
///
/// `start` runs on a spawned task while `stop` runs inline, so a sign-out
/// can land before the sign-in's task is first polled. Each auth event bumps
/// a generation counter; the task re-checks it around `start` and stands
/// down (or stops the session it just started) when superseded.
///
/// Returns the auth subscription handle; dropping the binding does not stop
/// an already-running session.
pub fn bind_auth(store: Arc<VisitedStore>, auth: &dyn AuthGateway) -> Unsubscribe {
    let generation = Arc::new(Mutex::new(0u64));
    auth.on_auth_state(Arc::new(move |identity| {
        let current = {
            let mut guard = generation.lock();
            *guard += 1;
            *guard
        };
        match identity {
            Some(uid) => {
                let store = Arc::clone(&store);
                let generation = Arc::clone(&generation);
                tokio::spawn(async move {
                    if *generation.lock() != current {
                        return;
                    }
                    store.start(uid).await;
                    if *generation.lock() != current {
                        store.stop();
                    }
                });
            }
            None => store.stop(),
        }
    }))
}

// ============================================================================
// FakeAuth
// ============================================================================

/// Deterministic in-process `AuthGateway`.
#[derive(Default)]
pub struct FakeAuth {
    current: Mutex<Option<UserId>>,
    emitter: Arc<EventEmitter<Option<UserId>>>,
}

impl FakeAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start signed-in as `uid`.
    pub fn signed_in(uid: UserId) -> Self {
        let auth = Self::default();
        *auth.current.lock() = Some(uid);
        auth
    }

    pub fn sign_in(&self, uid: UserId) {
        *self.current.lock() = Some(uid.clone());
        self.emitter.emit(&Some(uid));
    }

    pub fn sign_out(&self) {
        *self.current.lock() = None;
        self.emitter.emit(&None);
    }
}

impl AuthGateway for FakeAuth {
    fn current_user(&self) -> Option<UserId> {
        self.current.lock().clone()
    }

    fn on_auth_state(&self, callback: AuthCallback) -> Unsubscribe {
        let cb = Arc::clone(&callback);
        let id = self
            .emitter
            .on(move |identity: &Option<UserId>| cb(identity.clone()));

        // Initial resolved state, delivered synchronously on registration.
        callback(self.current.lock().clone());

        let emitter = Arc::clone(&self.emitter);
        Box::new(move || emitter.off(id))
    }
}
