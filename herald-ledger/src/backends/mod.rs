//! Outcome store implementations
//!
//! - `memory`: in-process ring buffer for tests and dry runs
//! - `test`: memory store with append notifications and fault injection
//! - `file`: JSON file with atomic replace for production use

pub mod file;
pub mod memory;

pub use file::{FileOutcomeStore, FileOutcomeStoreBuilder};
pub use memory::MemoryOutcomeStore;
pub use test::TestOutcomeStore;
