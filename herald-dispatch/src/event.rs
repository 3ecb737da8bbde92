use std::time::Duration;

use herald_common::Outcome;

use crate::{job::BatchId, result::Completion};

/// Progress published while a batch runs
///
/// Delivered over a broadcast channel; a subscriber that falls behind loses
/// events rather than holding up the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Started {
        batch: BatchId,
        total: usize,
    },
    /// A rest interval is starting before the recipient at `before_index`
    AutoPause {
        before_index: usize,
        duration: Duration,
    },
    Attempted {
        index: usize,
        outcome: Outcome,
    },
    /// Inter-send delay is starting
    Waiting {
        duration: Duration,
    },
    Finished {
        batch: BatchId,
        attempted: usize,
        succeeded: usize,
        completion: Completion,
    },
}
