//! The `RemoteDocs` trait — per-user document I/O with merge writes and
//! snapshot subscriptions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::reactive::Unsubscribe;
use crate::types::UserId;

/// Snapshot listener: receives the current document, or `None` if the
/// document does not exist.
pub type SnapshotCallback = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Backend-implemented capability over one document per user.
///
/// Semantics the store relies on:
/// - `set_merge` merges at the top-level field granularity: keys present in
///   `fields` overwrite, absent keys are untouched. The backend assigns
///   `updatedAt` on every write. A missing document is created.
/// - `subscribe` delivers the current state soon after registration, then
///   again after every subsequent write for that user, until the returned
///   [`Unsubscribe`] handle is invoked.
///
/// No cross-device ordering is promised — last write wins at the field level.
#[async_trait]
pub trait RemoteDocs: Send + Sync {
    /// Read the user's document once. `Ok(None)` means it does not exist.
    async fn read_once(&self, uid: &UserId) -> Result<Option<Value>, RemoteError>;

    /// Merge `fields` into the user's document, creating it if missing.
    async fn set_merge(&self, uid: &UserId, fields: Value) -> Result<(), RemoteError>;

    /// Register a snapshot listener for the user's document.
    fn subscribe(&self, uid: &UserId, callback: SnapshotCallback) -> Unsubscribe;
}
