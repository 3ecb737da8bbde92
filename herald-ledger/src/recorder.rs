use std::{collections::VecDeque, sync::Arc};

use herald_common::{AccountId, Outcome, internal};
use tokio::sync::Mutex;

use crate::{
    backends::MemoryOutcomeStore,
    stats::{AccountStats, LedgerStats},
    store::OutcomeStore,
};

/// Where an outcome ended up after [`Recorder::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Durable in the store
    Persisted,
    /// Held in the backlog until the store accepts it
    Deferred,
}

/// Buffered front for an [`OutcomeStore`]
///
/// Outcomes the store refuses are queued in order and retried ahead of the
/// next record or on [`Recorder::flush`]. Nothing handed to `record` is ever
/// dropped; at worst it sits in the backlog.
#[derive(Debug, Clone)]
pub struct Recorder {
    store: Arc<dyn OutcomeStore>,
    backlog: Arc<Mutex<VecDeque<Outcome>>>,
}

impl Recorder {
    pub fn new(store: Arc<dyn OutcomeStore>) -> Self {
        Self {
            store,
            backlog: Arc::default(),
        }
    }

    /// A recorder over a fresh in-memory store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryOutcomeStore::new()))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn OutcomeStore> {
        &self.store
    }

    /// Record one outcome
    ///
    /// Any backlog is retried first so the store sees outcomes in the order
    /// they happened. If the backlog cannot be drained, this outcome joins it.
    pub async fn record(&self, outcome: Outcome) -> RecordStatus {
        let mut backlog = self.backlog.lock().await;

        if !self.drain(&mut backlog).await {
            backlog.push_back(outcome);
            return RecordStatus::Deferred;
        }

        match self.store.append(&outcome).await {
            Ok(()) => RecordStatus::Persisted,
            Err(err) => {
                internal!(
                    level = WARN,
                    "Unable to persist outcome for {} -> {}, holding it for retry: {err}",
                    outcome.account,
                    outcome.recipient
                );
                backlog.push_back(outcome);
                RecordStatus::Deferred
            }
        }
    }

    /// Retry the backlog, returning how many outcomes remain unpersisted
    pub async fn flush(&self) -> usize {
        let mut backlog = self.backlog.lock().await;
        self.drain(&mut backlog).await;
        backlog.len()
    }

    pub async fn backlog_len(&self) -> usize {
        self.backlog.lock().await.len()
    }

    /// Append queued outcomes oldest first, stopping at the first refusal
    async fn drain(&self, backlog: &mut VecDeque<Outcome>) -> bool {
        while let Some(outcome) = backlog.front() {
            if let Err(err) = self.store.append(outcome).await {
                internal!(
                    level = WARN,
                    "Outcome store still unavailable, {} outcomes held: {err}",
                    backlog.len()
                );
                return false;
            }
            backlog.pop_front();
        }

        true
    }

    /// Stored history followed by anything still waiting in the backlog
    ///
    /// # Errors
    /// If the store exists but cannot be read
    pub async fn history(&self) -> crate::Result<Vec<Outcome>> {
        let mut history = self.store.load().await?;
        history.extend(self.backlog.lock().await.iter().cloned());
        Ok(history)
    }

    /// Aggregate statistics over the retained history
    ///
    /// # Errors
    /// If the store exists but cannot be read
    pub async fn load_stats(&self) -> crate::Result<LedgerStats> {
        Ok(LedgerStats::from_history(&self.history().await?))
    }

    /// Statistics for one account over the retained history
    ///
    /// # Errors
    /// If the store exists but cannot be read
    pub async fn stats_for_account(&self, account: &AccountId) -> crate::Result<AccountStats> {
        Ok(AccountStats::from_history(&self.history().await?, account))
    }
}
