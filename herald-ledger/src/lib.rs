//! Durable, bounded log of send outcomes
//!
//! Every send attempt the dispatcher makes ends up here, success or not.
//! The log keeps the most recent [`DEFAULT_RETENTION`] outcomes, evicting the
//! oldest first, and derives aggregate and per-account statistics from them.
//!
//! Storage is pluggable through [`OutcomeStore`]:
//! - [`MemoryOutcomeStore`]: in-process ring, for tests and dry runs
//! - [`FileOutcomeStore`]: JSON file with atomic replace, for production
//! - [`TestOutcomeStore`]: memory store with append notifications and fault injection
//!
//! [`Recorder`] sits in front of a store and makes sure an unavailable store
//! never costs an outcome: failed appends are kept in a backlog and retried.

pub mod backends;
pub mod config;
pub mod error;
pub mod recorder;
pub mod stats;
pub mod store;

pub use backends::{FileOutcomeStore, FileOutcomeStoreBuilder, MemoryOutcomeStore, TestOutcomeStore};
pub use config::{LedgerConfig, MemoryConfig};
pub use error::{LedgerError, Result, ValidationError};
pub use recorder::{RecordStatus, Recorder};
pub use stats::{AccountStats, LedgerStats};
pub use store::OutcomeStore;

/// How many outcomes a store keeps before evicting the oldest
pub const DEFAULT_RETENTION: usize = 1000;
