use herald_common::Outcome;
use serde::{Deserialize, Serialize};

use crate::job::BatchId;

/// How a batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// Every recipient was attempted
    Completed,
    /// Stopped early by a shutdown signal
    Cancelled,
}

/// Summary of one batch run, produced once when the run ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch: BatchId,
    /// One per attempted recipient, in recipient order
    pub outcomes: Vec<Outcome>,
    pub total_recipients: usize,
    pub total_attempted: usize,
    pub total_succeeded: usize,
    pub completion: Completion,
    /// Outcomes the recorder still holds because the store refused them
    pub unpersisted: usize,
}

impl BatchResult {
    pub(crate) fn new(
        batch: BatchId,
        outcomes: Vec<Outcome>,
        total_recipients: usize,
        completion: Completion,
        unpersisted: usize,
    ) -> Self {
        let total_succeeded = outcomes.iter().filter(|o| o.succeeded()).count();

        Self {
            batch,
            total_recipients,
            total_attempted: outcomes.len(),
            total_succeeded,
            outcomes,
            completion,
            unpersisted,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.completion == Completion::Cancelled
    }

    /// Flat per-recipient view in the layout existing consumers expect
    #[must_use]
    pub fn legacy_results(&self) -> Vec<LegacyResult> {
        self.outcomes
            .iter()
            .map(|outcome| LegacyResult {
                phone: outcome.recipient.clone(),
                profile: outcome.account.to_string(),
                status: outcome.succeeded(),
            })
            .collect()
    }

    /// Response payload for callers at the submission boundary
    #[must_use]
    pub fn report(&self) -> BatchReport {
        BatchReport {
            success: true,
            batch: self.batch,
            results: self.legacy_results(),
            total: self.total_recipients,
            sent: self.total_succeeded,
            completion: self.completion,
            unpersisted: self.unpersisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResult {
    pub phone: String,
    pub profile: String,
    pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success: bool,
    pub batch: BatchId,
    pub results: Vec<LegacyResult>,
    /// Recipients in the job, attempted or not
    pub total: usize,
    /// Recipients whose send succeeded
    pub sent: usize,
    pub completion: Completion,
    pub unpersisted: usize,
}
