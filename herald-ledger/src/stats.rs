//! Aggregates derived from the retained outcome history

use herald_common::{AccountId, Outcome};
use serde::{Deserialize, Serialize};

/// How many of the newest outcomes `LedgerStats` carries verbatim
pub const RECENT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_sent: usize,
    pub total_delivered: usize,
    pub total_failed: usize,
    /// Newest first
    pub recent_messages: Vec<Outcome>,
}

impl LedgerStats {
    /// Summarise a history ordered oldest first
    #[must_use]
    pub fn from_history(history: &[Outcome]) -> Self {
        let total_delivered = history.iter().filter(|o| o.succeeded()).count();

        Self {
            total_sent: history.len(),
            total_delivered,
            total_failed: history.len() - total_delivered,
            recent_messages: history.iter().rev().take(RECENT).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStats {
    pub messages_sent: usize,
    pub successful: usize,
    pub failed: usize,
}

impl AccountStats {
    #[must_use]
    pub fn from_history(history: &[Outcome], account: &AccountId) -> Self {
        history
            .iter()
            .filter(|o| &o.account == account)
            .fold(Self::default(), |mut stats, outcome| {
                stats.messages_sent += 1;
                if outcome.succeeded() {
                    stats.successful += 1;
                } else {
                    stats.failed += 1;
                }
                stats
            })
    }
}
