//! Reactive layer — synchronous pub/sub used by the store and the in-memory
//! remote backend.
//!
//! # Modules
//!
//! - [`event`] — [`StoreEvent`] enum.
//! - [`event_emitter`] — Generic typed pub/sub ([`EventEmitter<T>`]).

pub mod event;
pub mod event_emitter;

pub use event::StoreEvent;
pub use event_emitter::{EventEmitter, ListenerId};

/// Handle returned by every `subscribe`/`on_*` call — invoke it to detach.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;
