//! Validated, immutable description of a dispatch run.

use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use herald_common::{Account, AccountId, MediaRef, Recipient};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{error::ValidationError, pacing::PacingPolicy};

/// Identifies one batch run in logs, events and the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Ulid);

impl BatchId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one account sends: its text and at most one image and one audio clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub text: String,
    #[serde(default)]
    pub image: Option<MediaRef>,
    #[serde(default)]
    pub audio: Option<MediaRef>,
}

impl Assignment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            audio: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(MediaRef::new(image));
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl Into<PathBuf>) -> Self {
        self.audio = Some(MediaRef::new(audio));
        self
    }
}

/// Account to assignment mapping with unique keys, in insertion order
///
/// Insertion order is the rotation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments {
    entries: Vec<(Account, Assignment)>,
}

impl Assignments {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an account at the end of the rotation
    ///
    /// # Errors
    /// If the account is already assigned
    pub fn insert(&mut self, account: Account, assignment: Assignment) -> Result<(), ValidationError> {
        if self.contains(&account.id) {
            return Err(ValidationError::DuplicateAccount(account.id));
        }

        self.entries.push((account, assignment));
        Ok(())
    }

    /// Builder-style [`Assignments::insert`]
    ///
    /// # Errors
    /// If the account is already assigned
    pub fn with(mut self, account: Account, assignment: Assignment) -> Result<Self, ValidationError> {
        self.insert(account, assignment)?;
        Ok(self)
    }

    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.entries.iter().any(|(account, _)| &account.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &AccountId) -> Option<&Assignment> {
        self.entries
            .iter()
            .find_map(|(account, assignment)| (&account.id == id).then_some(assignment))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.entries.iter().map(|(account, _)| account)
    }

    pub(crate) fn entry(&self, position: usize) -> Option<(&Account, &Assignment)> {
        self.entries
            .get(position)
            .map(|(account, assignment)| (account, assignment))
    }
}

/// A dispatch run that has passed validation
///
/// Recipients and assignments are non-empty, account keys are unique and
/// every recipient has an address. There is no way to build a `BatchJob`
/// that breaks these.
#[derive(Debug, Clone)]
pub struct BatchJob {
    id: BatchId,
    recipients: Vec<Recipient>,
    assignments: Assignments,
    pacing: PacingPolicy,
}

impl BatchJob {
    /// # Errors
    /// If any of the batch invariants do not hold
    pub fn new(
        recipients: Vec<Recipient>,
        assignments: Assignments,
        pacing: PacingPolicy,
    ) -> Result<Self, ValidationError> {
        if recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }

        if assignments.is_empty() {
            return Err(ValidationError::NoAssignments);
        }

        if let Some(position) = recipients
            .iter()
            .position(|r| r.address.trim().is_empty())
        {
            return Err(ValidationError::BlankRecipient(position));
        }

        pacing.validate()?;

        Ok(Self {
            id: BatchId::generate(),
            recipients,
            assignments,
            pacing,
        })
    }

    #[must_use]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    #[must_use]
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    #[must_use]
    pub const fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    #[must_use]
    pub const fn pacing(&self) -> &PacingPolicy {
        &self.pacing
    }
}

/// One account entry of a job file
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentSpec {
    pub account: AccountId,
    /// Session storage for the account; resolved against a profile root when absent
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
    pub text: String,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub audio: Option<PathBuf>,
}

/// Batch job as written in a job file, before validation
///
/// ```ron
/// (
///     recipients: ["+15550100", (address: "+15550101", text_override: Some("hey"))],
///     assignments: [
///         (account: "work", text: "hi", image: Some("./promo.png")),
///         (account: "home", text: "yo"),
///     ],
///     pacing: (mode: RandomJittered, auto_pause: (enabled: true, after: 30)),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub assignments: Vec<AssignmentSpec>,
    #[serde(default)]
    pub pacing: PacingPolicy,
}

impl JobSpec {
    /// Fill in missing session directories as `root/<account>`
    #[must_use]
    pub fn with_session_root(mut self, root: &Path) -> Self {
        for spec in &mut self.assignments {
            if spec.session_dir.is_none() {
                spec.session_dir = Some(root.join(spec.account.as_str()));
            }
        }
        self
    }
}

impl TryFrom<JobSpec> for BatchJob {
    type Error = ValidationError;

    fn try_from(spec: JobSpec) -> Result<Self, Self::Error> {
        let mut assignments = Assignments::new();
        for entry in spec.assignments {
            let session_dir = entry
                .session_dir
                .unwrap_or_else(|| PathBuf::from(entry.account.as_str()));
            let assignment = Assignment {
                text: entry.text,
                image: entry.image.map(MediaRef::new),
                audio: entry.audio.map(MediaRef::new),
            };
            assignments.insert(Account::new(entry.account, session_dir), assignment)?;
        }

        Self::new(spec.recipients, assignments, spec.pacing)
    }
}
