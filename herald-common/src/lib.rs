//! Shared vocabulary for the herald dispatch engine
//!
//! Everything that more than one herald crate needs to agree on lives here:
//! the identity of a sending account, a recipient and its media, the outcome
//! of one send attempt, and the logging bootstrap used by the binaries.

pub mod account;
pub mod logging;
pub mod outcome;
pub mod recipient;

pub use account::{Account, AccountId};
pub use outcome::{FailureKind, Outcome, OutcomeStatus};
pub use recipient::{MediaRef, Recipient};
pub use tracing;

/// Process-wide control signal, fanned out over a broadcast channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop whatever is running and return what has been done so far
    Shutdown,
}
