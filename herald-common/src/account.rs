//! Sending accounts
//!
//! An account is one sender identity with its own persisted browser session.
//! Accounts are created out-of-band; the engine only ever reads them.

use std::{
    fmt::{self, Display},
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

/// Unique name of a sending account
///
/// Cheap to clone, so it can be stamped onto every [`crate::Outcome`]
/// without copying the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct AccountId(Arc<str>);

impl AccountId {
    #[must_use]
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for AccountId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

/// An account together with the location of its session storage
///
/// The session directory is opaque to the engine: it is handed to the send
/// capability untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub session_dir: PathBuf,
}

impl Account {
    #[must_use]
    pub fn new(id: impl Into<AccountId>, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            session_dir: session_dir.into(),
        }
    }

    #[must_use]
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }
}
