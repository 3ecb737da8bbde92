use async_trait::async_trait;
use herald_common::{Account, MediaRef, Recipient};

use crate::error::SendError;

/// Everything needed for one delivery attempt
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    pub account: &'a Account,
    pub recipient: &'a Recipient,
    /// Assignment text, or the recipient's override
    pub text: &'a str,
    pub image: Option<&'a MediaRef>,
    pub audio: Option<&'a MediaRef>,
}

/// External operation that delivers one message
///
/// Implementations own their timeout: a call must return within a bounded
/// time, reporting a temporary failure when it cannot finish.
#[async_trait]
pub trait SendCapability: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Classified by how the failure should be treated; see [`SendError`]
    async fn send_one(&self, request: SendRequest<'_>) -> Result<(), SendError>;
}
