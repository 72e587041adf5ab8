//! Durable persistence for transcript batches
//!
//! - `DatabaseAdapter`: durable-storage gateway with exactly-once append
//!   semantics anchored on the durable entry count (the high-water mark)
//! - `BatchCoordinator`: save-trigger policy plus the at-most-one-save-in-
//!   flight-per-session guarantee

mod adapter;
mod batch;

pub use adapter::{
    AppendReport, DatabaseAdapter, EntrySink, PersistError, SessionRecord, SessionSeed, StoredEntry,
};
pub use batch::{BatchCoordinator, SaveOutcome, SavePolicy};
