//! Batch dispatch for herald
//!
//! This crate turns a batch job (recipients, per-account assignments and a
//! pacing policy) into a sequence of send attempts:
//! - Validate the job once, up front
//! - Rotate accounts round-robin over the assignment order
//! - Pace sends and insert auto-pauses on recipient-count boundaries
//! - Record every outcome, success or failure, through the ledger
//! - Stop early, with a partial result, on shutdown

mod dispatcher;
mod error;
mod event;
mod job;
mod pacing;
mod result;
mod rotator;
mod send;
pub mod sleeper;

pub use dispatcher::Dispatcher;
pub use error::{
    DispatchError, PermanentError, SendError, SystemError, TemporaryError, ValidationError,
};
pub use event::DispatchEvent;
pub use job::{Assignment, AssignmentSpec, Assignments, BatchId, BatchJob, JobSpec};
pub use pacing::{AutoPause, JITTER_MAX_SECS, JITTER_MIN_SECS, PacingMode, PacingPolicy};
pub use result::{BatchReport, BatchResult, Completion, LegacyResult};
pub use rotator::AccountRotator;
pub use send::{SendCapability, SendRequest};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
