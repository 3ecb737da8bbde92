use herald_common::Account;

use crate::job::{Assignment, Assignments};

/// Round-robin account selection over the assignment order captured at
/// batch start
///
/// Selection depends only on the attempt index, never on earlier results,
/// so re-running a job with the same assignment order reproduces the same
/// account sequence.
#[derive(Debug, Clone, Copy)]
pub struct AccountRotator<'a> {
    assignments: &'a Assignments,
}

impl<'a> AccountRotator<'a> {
    #[must_use]
    pub const fn new(assignments: &'a Assignments) -> Self {
        Self { assignments }
    }

    /// Account and assignment for the recipient at zero-based `index`
    ///
    /// `None` only when there are no assignments, which a validated batch
    /// never has.
    #[must_use]
    pub fn select(&self, index: usize) -> Option<(&'a Account, &'a Assignment)> {
        match self.assignments.len() {
            0 => None,
            len => self.assignments.entry(index % len),
        }
    }

    /// The accounts used for the first `count` recipients, in order
    #[cfg(test)]
    fn sequence(&self, count: usize) -> impl Iterator<Item = &'a Account> {
        let rotator = *self;
        (0..count).filter_map(move |index| rotator.select(index).map(|(account, _)| account))
    }
}
