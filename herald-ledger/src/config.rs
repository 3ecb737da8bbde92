use std::sync::Arc;

use serde::Deserialize;

use crate::{
    DEFAULT_RETENTION,
    backends::{FileOutcomeStore, MemoryOutcomeStore},
    store::OutcomeStore,
};

/// Selects the outcome store at runtime
///
/// Examples assume the `unwrap_variant_newtypes` RON extension, which the
/// herald config loader enables.
///
/// File-backed log (the default) in RON config:
/// ```ron
/// Herald (
///     ledger: File(
///         path: "./logs/messages.json",
///         retention: 1000,
///     ),
/// )
/// ```
///
/// Memory-backed log for dry runs:
/// ```ron
/// Herald (
///     ledger: Memory(retention: 200),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub enum LedgerConfig {
    /// JSON file that survives restarts
    File(FileOutcomeStore),
    /// Lost on exit
    Memory(MemoryConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_retention")]
    pub retention: usize,
}

const fn default_retention() -> usize {
    DEFAULT_RETENTION
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::File(FileOutcomeStore::default())
    }
}

impl LedgerConfig {
    /// Filesystem location of the log, for file-backed ledgers
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File(store) => Some(store.path()),
            Self::Memory(_) => None,
        }
    }

    /// Build the configured store, initialising it where needed
    ///
    /// # Errors
    /// If a file-backed log location cannot be prepared
    pub async fn into_store(self) -> crate::Result<Arc<dyn OutcomeStore>> {
        match self {
            Self::File(store) => {
                store.init().await?;
                Ok(Arc::new(store))
            }
            Self::Memory(config) => Ok(Arc::new(MemoryOutcomeStore::with_retention(
                config.retention,
            ))),
        }
    }
}
