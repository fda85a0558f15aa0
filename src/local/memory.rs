//! MemoryLegacy — in-process legacy store for tests and guest sessions.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::error::LocalError;
use crate::types::CountryCode;

use super::LegacyStore;

#[derive(Default)]
struct MemoryLegacyInner {
    codes: BTreeSet<CountryCode>,
    fail: bool,
}

/// In-memory `LegacyStore` with failure injection.
#[derive(Default)]
pub struct MemoryLegacy {
    inner: Mutex<MemoryLegacyInner>,
}

impl MemoryLegacy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the legacy set (simulates pre-migration device data).
    pub fn seed(&self, codes: impl IntoIterator<Item = CountryCode>) {
        self.inner.lock().codes.extend(codes);
    }

    /// Make subsequent `load`/`clear` calls fail (until called with `false`).
    pub fn fail(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Whether any legacy data remains.
    pub fn is_cleared(&self) -> bool {
        self.inner.lock().codes.is_empty()
    }
}

impl LegacyStore for MemoryLegacy {
    fn load(&self) -> Result<BTreeSet<CountryCode>, LocalError> {
        let inner = self.inner.lock();
        if inner.fail {
            return Err(LocalError::Backend("injected load failure".to_string()));
        }
        Ok(inner.codes.clone())
    }

    fn clear(&self) -> Result<(), LocalError> {
        let mut inner = self.inner.lock();
        if inner.fail {
            return Err(LocalError::Backend("injected clear failure".to_string()));
        }
        inner.codes.clear();
        Ok(())
    }
}
