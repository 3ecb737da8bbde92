use async_trait::async_trait;
use herald_common::Outcome;

/// Persistence seam for the outcome log
///
/// Implementations must make `append` atomic per call: concurrent appends
/// from several recorders may interleave, but none may be lost or torn.
#[async_trait]
pub trait OutcomeStore: Send + Sync + std::fmt::Debug {
    /// Append one outcome, evicting the oldest entries beyond retention
    ///
    /// # Errors
    /// If the outcome could not be made durable
    async fn append(&self, outcome: &Outcome) -> crate::Result<()>;

    /// Every retained outcome, oldest first
    ///
    /// An absent or empty store yields an empty history, not an error.
    ///
    /// # Errors
    /// If the backing storage exists but cannot be read or decoded
    async fn load(&self) -> crate::Result<Vec<Outcome>>;

    /// Maximum number of outcomes this store keeps
    fn retention(&self) -> usize;
}
