//! StoreEvent — emitted by `VisitedStore` after each mirror change so the
//! presentation layer knows to recompute stats / re-render.

use crate::types::CountryCode;

/// A mirror change emitted by the visited store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Initial hydration (or re-hydration after a restart) completed.
    Hydrated { visited: usize },
    /// A single code was toggled locally.
    Toggled { code: CountryCode, visited: bool },
    /// A bulk mark/unmark touched these codes.
    Bulk {
        codes: Vec<CountryCode>,
        visited: bool,
    },
    /// A remote snapshot replaced the mirror.
    Remote { visited: usize },
    /// The session ended and the mirror was cleared.
    Cleared,
}
