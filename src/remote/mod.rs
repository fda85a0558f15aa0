//! Remote document capability — the seam between the visited store and the
//! cloud document backend.
//!
//! The store's state machine is defined in terms of "a read resolves" / "an
//! update arrives"; an implementation may satisfy [`RemoteDocs`] with one-shot
//! reads, polling, or push subscriptions. [`MemoryRemote`] is the in-process
//! implementation used by tests and embedding harnesses.

pub mod docs;
pub mod memory;

pub use docs::{RemoteDocs, SnapshotCallback};
pub use memory::MemoryRemote;
