//! The visited-set store: state machine, optimistic mirror, one-time legacy
//! migration, date backfill, and the write-coalescing layer under it.

pub mod coalesce;
pub mod visited;

pub use coalesce::WriteCoalescer;
pub use visited::VisitedStore;
