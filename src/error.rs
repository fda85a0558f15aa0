use thiserror::Error;

// ---------------------------------------------------------------------------
// CodeParseError
// ---------------------------------------------------------------------------

/// Rejection of a would-be country code at the boundary.
///
/// Codes must be 2–3 ASCII letters; anything else is refused here rather than
/// silently stored (readers of *remote* data drop bad codes instead — see
/// `VisitedDoc::from_value`).
#[derive(Debug, Clone, Error)]
#[error("invalid country code {input:?}: expected 2-3 ASCII letters")]
pub struct CodeParseError {
    pub input: String,
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Failure talking to the remote document backend.
///
/// These never reach mutation callers — the store converts them into the
/// advisory `SyncStatus::Error` signal and logs them.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// LocalError
// ---------------------------------------------------------------------------

/// Failure reading or clearing the device-local legacy store.
///
/// Corrupt payloads are NOT errors — they load as an empty set. Only genuine
/// I/O problems surface here.
#[derive(Debug, Error)]
pub enum LocalError {
    #[error("legacy store error: {0}")]
    Backend(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// CdxError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CdxError {
    #[error(transparent)]
    Code(#[from] CodeParseError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Local(#[from] LocalError),
}

/// Convenience alias — the default error type is `CdxError`.
pub type Result<T, E = CdxError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
