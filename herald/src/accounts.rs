//! Sender accounts on disk
//!
//! Each account is a directory under the profile root holding the messaging
//! client's session state, plus an optional `profile_info.json` describing
//! it. Accounts are created out-of-band; this module only reads them, apart
//! from stamping `last_used` after a successful send.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use herald_common::{Account, AccountId, internal};
use herald_ledger::{AccountStats, LedgerError, Recorder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROFILE_INFO_FILE: &str = "profile_info.json";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Profile not found: {0}")]
    NotFound(AccountId),

    #[error("Invalid profile name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed profile info: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unable to read send history: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountStoreConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("./profiles")
}

impl Default for AccountStoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl AccountStoreConfig {
    #[must_use]
    pub fn into_store(self) -> AccountStore {
        AccountStore::new(self.root)
    }
}

/// Descriptive details kept beside an account's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Falls back to the profile directory name
    #[serde(default)]
    pub name: String,
    #[serde(default = "defaults::phone")]
    pub phone: String,
    #[serde(default = "defaults::created_at")]
    pub created_at: String,
    #[serde(default = "defaults::last_used")]
    pub last_used: String,
}

impl AccountInfo {
    fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: defaults::phone(),
            created_at: defaults::created_at(),
            last_used: defaults::last_used(),
        }
    }
}

/// An account's details joined with its send statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOverview {
    #[serde(flatten)]
    pub info: AccountInfo,
    pub statistics: AccountStats,
}

mod defaults {
    pub fn phone() -> String {
        "N/A".to_string()
    }

    pub fn created_at() -> String {
        "Unknown".to_string()
    }

    pub fn last_used() -> String {
        "Never".to_string()
    }
}

/// Directory of account profiles
#[derive(Debug, Clone)]
pub struct AccountStore {
    root: PathBuf,
}

impl AccountStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, name: &str) -> Result<PathBuf, AccountError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name != "..";
        if !valid {
            return Err(AccountError::InvalidName(name.to_string()));
        }

        Ok(self.root.join(name))
    }

    /// Every account, sorted by name
    ///
    /// A missing profile root means no accounts.
    ///
    /// # Errors
    /// If the profile root cannot be read
    pub fn list(&self) -> Result<Vec<Account>, AccountError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut accounts = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() && !name.starts_with('.') {
                accounts.push(Account::new(name, entry.path()));
            }
        }

        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    /// Look up one account by name
    ///
    /// # Errors
    /// If the name is invalid or no such profile exists
    pub fn get(&self, name: &str) -> Result<Account, AccountError> {
        let dir = self.profile_dir(name)?;
        if !dir.is_dir() {
            return Err(AccountError::NotFound(name.into()));
        }

        Ok(Account::new(name, dir))
    }

    /// Details for one account, with placeholders for anything unrecorded
    ///
    /// # Errors
    /// If the account does not exist, or its info file is unreadable
    pub fn info(&self, name: &str) -> Result<AccountInfo, AccountError> {
        let account = self.get(name)?;

        let content = match std::fs::read(account.session_dir().join(PROFILE_INFO_FILE)) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(AccountInfo::unknown(name));
            }
            Err(err) => return Err(err.into()),
        };

        let mut info: AccountInfo = serde_json::from_slice(&content)?;

        if info.name.is_empty() {
            info.name = name.to_string();
        }
        Ok(info)
    }

    /// Details for one account together with its statistics from `recorder`
    ///
    /// # Errors
    /// If the account cannot be read, or the send history is unreadable
    pub async fn overview(
        &self,
        name: &str,
        recorder: &Recorder,
    ) -> Result<AccountOverview, AccountError> {
        let info = self.info(name)?;
        let statistics = recorder.stats_for_account(&AccountId::from(name)).await?;

        Ok(AccountOverview { info, statistics })
    }

    /// Every account with its statistics, sorted by name
    ///
    /// # Errors
    /// If the profile root or the send history cannot be read
    pub async fn list_with_stats(
        &self,
        recorder: &Recorder,
    ) -> Result<Vec<(Account, AccountStats)>, AccountError> {
        let history = recorder.history().await?;

        Ok(self
            .list()?
            .into_iter()
            .map(|account| {
                let stats = AccountStats::from_history(&history, &account.id);
                (account, stats)
            })
            .collect())
    }
}

/// Stamp `last_used` in an account's info file, if it has one
///
/// Failures are logged and otherwise ignored: the send they follow has
/// already happened.
pub async fn touch_last_used(session_dir: &Path) {
    let path = session_dir.join(PROFILE_INFO_FILE);

    let update = async {
        let content = tokio::fs::read(&path).await?;
        let mut info: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&content)?;
        info.insert(
            "last_used".to_string(),
            chrono::Utc::now().to_rfc3339().into(),
        );
        tokio::fs::write(&path, serde_json::to_vec(&info)?).await?;
        Ok::<_, AccountError>(())
    };

    match update.await {
        Ok(()) => {}
        Err(AccountError::Io(err)) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => internal!(
            level = WARN,
            "Unable to update last_used in {}: {err}",
            path.display()
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_common::{FailureKind, Outcome};
    use pretty_assertions::assert_eq;

    use super::*;

    fn store_with(names: &[&str]) -> (tempfile::TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        let store = AccountStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_list_sorted_directories_only() {
        let (dir, store) = store_with(&["zeta", "alpha", "mid"]);
        std::fs::write(dir.path().join("notes.txt"), "not an account").unwrap();

        let names: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let store = AccountStore::new("/nonexistent/profiles");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_info_defaults_without_file() {
        let (_dir, store) = store_with(&["work"]);

        assert_eq!(
            store.info("work").unwrap(),
            AccountInfo {
                name: "work".into(),
                phone: "N/A".into(),
                created_at: "Unknown".into(),
                last_used: "Never".into(),
            }
        );
    }

    #[test]
    fn test_info_reads_partial_file() {
        let (dir, store) = store_with(&["work"]);
        std::fs::write(
            dir.path().join("work").join(PROFILE_INFO_FILE),
            r#"{"name": "work", "phone": "+15550100"}"#,
        )
        .unwrap();

        let info = store.info("work").unwrap();
        assert_eq!(info.phone, "+15550100");
        assert_eq!(info.created_at, "Unknown");
        assert_eq!(info.last_used, "Never");
    }

    #[test]
    fn test_info_without_name_keeps_profile_name() {
        let (dir, store) = store_with(&["work"]);
        std::fs::write(
            dir.path().join("work").join(PROFILE_INFO_FILE),
            r#"{"phone": "+15550100"}"#,
        )
        .unwrap();

        let info = store.info("work").unwrap();
        assert_eq!(info.name, "work");
        assert_eq!(info.phone, "+15550100");
    }

    #[tokio::test]
    async fn test_overview_joins_statistics() {
        let (_dir, store) = store_with(&["home", "work"]);
        let recorder = Recorder::in_memory();
        recorder
            .record(Outcome::success("work".into(), "+100"))
            .await;
        recorder
            .record(Outcome::failure("work".into(), "+200", FailureKind::NotFound))
            .await;
        recorder.record(Outcome::success("home".into(), "+300")).await;

        let overview = store.overview("work", &recorder).await.unwrap();
        assert_eq!(overview.info.name, "work");
        assert_eq!(
            overview.statistics,
            AccountStats {
                messages_sent: 2,
                successful: 1,
                failed: 1,
            }
        );

        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["phone"], "N/A");
        assert_eq!(json["statistics"]["messages_sent"], 2);

        let listed: Vec<_> = store
            .list_with_stats(&recorder)
            .await
            .unwrap()
            .into_iter()
            .map(|(account, stats)| (account.id.to_string(), stats.messages_sent))
            .collect();
        assert_eq!(listed, vec![("home".to_string(), 1), ("work".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_overview_of_missing_profile() {
        let (_dir, store) = store_with(&[]);
        let err = store
            .overview("ghost", &Recorder::in_memory())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[test]
    fn test_missing_profile() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(store.info("ghost"), Err(AccountError::NotFound(_))));
        assert!(matches!(store.get("../etc"), Err(AccountError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_touch_last_used() {
        let (dir, store) = store_with(&["work"]);
        let info_path = dir.path().join("work").join(PROFILE_INFO_FILE);
        std::fs::write(&info_path, r#"{"name": "work", "last_used": "Never"}"#).unwrap();

        touch_last_used(store.get("work").unwrap().session_dir()).await;

        let info = store.info("work").unwrap();
        assert_ne!(info.last_used, "Never");
        assert_eq!(info.name, "work");
    }

    #[tokio::test]
    async fn test_touch_without_info_file_is_noop() {
        let (dir, store) = store_with(&["work"]);
        touch_last_used(store.get("work").unwrap().session_dir()).await;
        assert!(!dir.path().join("work").join(PROFILE_INFO_FILE).exists());
    }
}
