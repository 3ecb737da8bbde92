//! Typed errors for dispatch.
//!
//! Send failures are split the way their handling differs:
//! - Permanent: the recipient or account cannot be served, trying again is pointless
//! - Temporary: automation hiccups and timeouts, the same send may work later
//! - System: our own configuration or plumbing is broken
//!
//! None of these stop a batch; they are recorded against the recipient.
//! Only [`ValidationError`] (via [`DispatchError`]) is returned to the caller.

use std::convert::Infallible;

use herald_common::{AccountId, FailureKind};
use thiserror::Error;

/// Failure reported by a [`crate::SendCapability`] for one recipient.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

#[derive(Debug, Error)]
pub enum PermanentError {
    /// The address is not reachable through the messaging service.
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// The account's session is missing or logged out.
    #[error("Account unavailable: {0}")]
    AccountUnavailable(String),

    #[error("Message rejected: {0}")]
    MessageRejected(String),
}

#[derive(Debug, Error)]
pub enum TemporaryError {
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The automation driving the messaging client failed mid-send.
    #[error("Automation failed: {0}")]
    AutomationFailed(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SendError {
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Classification stored alongside the failed outcome
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Permanent(PermanentError::RecipientNotFound(_)) => FailureKind::NotFound,
            Self::Permanent(_) => FailureKind::Rejected,
            Self::Temporary(_) => FailureKind::Transient,
            Self::System(_) => FailureKind::Fatal,
        }
    }
}

/// Reasons a batch job is refused before anything is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Batch has no recipients")]
    NoRecipients,

    #[error("Batch has no account assignments")]
    NoAssignments,

    #[error("Account {0} is assigned more than once")]
    DuplicateAccount(AccountId),

    #[error("Recipient at position {0} has a blank address")]
    BlankRecipient(usize),

    #[error("Jitter range is inverted: {min}s > {max}s")]
    InvertedJitterRange { min: u64, max: u64 },

    #[error("Auto-pause is enabled but its interval is zero")]
    ZeroAutoPauseInterval,
}

/// Errors returned by [`crate::Dispatcher::run_batch`].
///
/// Cancellation is not an error: a cancelled run returns its partial result.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid batch: {0}")]
    Validation(#[from] ValidationError),
}

impl From<Infallible> for DispatchError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let not_found: SendError = PermanentError::RecipientNotFound("+1".into()).into();
        assert_eq!(not_found.kind(), FailureKind::NotFound);
        assert!(not_found.is_permanent());

        let rejected: SendError = PermanentError::AccountUnavailable("work".into()).into();
        assert_eq!(rejected.kind(), FailureKind::Rejected);

        let timeout: SendError = TemporaryError::Timeout("120s".into()).into();
        assert_eq!(timeout.kind(), FailureKind::Transient);
        assert!(!timeout.is_permanent() && !timeout.is_system());

        let io: SendError = SystemError::from(std::io::Error::other("broken pipe")).into();
        assert_eq!(io.kind(), FailureKind::Fatal);
        assert!(io.is_system());
    }

    #[test]
    fn test_error_display() {
        let err: SendError = TemporaryError::AutomationFailed("no message box".into()).into();
        assert_eq!(
            err.to_string(),
            "Temporary failure: Automation failed: no message box"
        );

        let err = DispatchError::from(ValidationError::BlankRecipient(3));
        assert_eq!(
            err.to_string(),
            "Invalid batch: Recipient at position 3 has a blank address"
        );
    }
}
