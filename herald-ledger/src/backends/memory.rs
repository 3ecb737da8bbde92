use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use herald_common::Outcome;
use parking_lot::Mutex;

use crate::{DEFAULT_RETENTION, store::OutcomeStore};

/// In-memory outcome store
///
/// Keeps outcomes in a ring protected by a mutex. Clones share the same ring,
/// so a store handed to several recorders still enforces one retention limit.
///
/// Nothing survives the process, which makes this the store for dry runs and
/// tests.
#[derive(Debug, Clone)]
pub struct MemoryOutcomeStore {
    pub(crate) outcomes: Arc<Mutex<VecDeque<Outcome>>>,
    retention: usize,
}

impl MemoryOutcomeStore {
    /// Create an empty store with the default retention
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Create an empty store keeping at most `retention` outcomes
    ///
    /// A retention of zero is raised to one; a store that keeps nothing
    /// cannot report statistics.
    #[must_use]
    pub fn with_retention(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::with_capacity(retention.min(64)))),
            retention,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every retained outcome
    pub fn clear(&self) {
        self.outcomes.lock().clear();
    }
}

impl Default for MemoryOutcomeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeStore for MemoryOutcomeStore {
    async fn append(&self, outcome: &Outcome) -> crate::Result<()> {
        let mut outcomes = self.outcomes.lock();
        outcomes.push_back(outcome.clone());
        while outcomes.len() > self.retention {
            outcomes.pop_front();
        }
        Ok(())
    }

    async fn load(&self) -> crate::Result<Vec<Outcome>> {
        Ok(self.outcomes.lock().iter().cloned().collect())
    }

    fn retention(&self) -> usize {
        self.retention
    }
}
