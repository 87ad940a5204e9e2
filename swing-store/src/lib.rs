//! Swing Store: durable state for the swing daemon
//!
//! Provides:
//! - `PersistedState`: the decision-state snapshot
//! - `StateStore`: snapshot persistence port
//! - `JsonFileStore`: atomic JSON file implementation
//! - `MemoryStore`: in-memory implementation for tests
//! - `RecoveryLog` / `TradeJournal`: append-only audit files

#![warn(clippy::all)]

pub mod error;
pub mod file;
pub mod journal;
pub mod memory;
pub mod repository;
pub mod snapshot;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use journal::{RecoveryLog, TradeJournal};
pub use memory::MemoryStore;
pub use repository::StateStore;
pub use snapshot::PersistedState;
