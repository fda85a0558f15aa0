//! cdxplore-core — the shared core of the CDXplore travel tracker.
//!
//! Country catalog, passport stats projection, and the per-user visited-set
//! store: hydration from a cloud document backend, one-time migration of
//! pre-cloud device data, optimistic toggles with coalesced remote writes,
//! and visit-date backfill. Platform shells (UI, navigation, the real
//! identity provider and document backend) live outside this crate and plug
//! in through the `remote`, `local`, and `auth` capability traits.

pub mod error;
pub mod types;

pub mod auth;
pub mod catalog;
pub mod local;
pub mod reactive;
pub mod remote;
pub mod stats;
pub mod store;

pub use catalog::Catalog;
pub use error::{CdxError, Result};
pub use stats::PassportStats;
pub use store::VisitedStore;
pub use types::{Continent, Country, CountryCode, StoreState, SyncStatus, UserId, VisitedDoc};
