//! Legacy device-local storage — the pre-cloud visited list.
//!
//! A single JSON array of country codes under the fixed key
//! [`STORAGE_KEY`], read once during the first hydration pass per user and
//! deleted after a successful migration. Corrupt payloads load as an empty
//! set; only real I/O failures surface as errors.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::collections::BTreeSet;

use crate::error::LocalError;
use crate::types::CountryCode;

pub use memory::MemoryLegacy;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLegacy;

/// Key the legacy visited array is stored under (shared with the web client).
pub const STORAGE_KEY: &str = "cdxplore_visited";

/// Capability over the device-local legacy store.
pub trait LegacyStore: Send + Sync {
    /// Load the legacy visited set. Malformed data yields an empty set.
    fn load(&self) -> Result<BTreeSet<CountryCode>, LocalError>;

    /// Delete the legacy data (called after a successful migration).
    fn clear(&self) -> Result<(), LocalError>;
}

/// Tolerant parse of the stored JSON payload: non-array input and entries
/// that are not valid codes are dropped silently.
pub(crate) fn parse_payload(raw: &str) -> BTreeSet<CountryCode> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return BTreeSet::new();
    };
    let Some(items) = value.as_array() else {
        return BTreeSet::new();
    };
    items
        .iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|s| CountryCode::parse(s).ok())
        .collect()
}
