use std::{
    collections::VecDeque,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use herald_common::{Outcome, internal};
use herald_tracing::traced;
use serde::Deserialize;
use tokio::{fs, sync::Mutex};

use crate::{DEFAULT_RETENTION, LedgerError, ValidationError, store::OutcomeStore};

const SYSTEM_PREFIXES: [&str; 9] = [
    "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
];

/// File-backed outcome store
///
/// The whole log lives in one pretty-printed JSON array, oldest first, so
/// the file stays readable by anything that consumed the legacy message log.
///
/// Every append rewrites the file through a sibling temp file followed by a
/// rename, so a crash mid-write leaves the previous log intact. Appends are
/// serialised through a mutex shared by every clone of the store.
#[derive(Debug, Clone)]
pub struct FileOutcomeStore {
    path: PathBuf,
    retention: usize,
    lock: Arc<Mutex<()>>,
}

impl Default for FileOutcomeStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/messages.json"),
            retention: DEFAULT_RETENTION,
            lock: Arc::default(),
        }
    }
}

impl<'de> Deserialize<'de> for FileOutcomeStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct FileOutcomeStoreHelper {
            #[serde(default = "default_path")]
            path: PathBuf,
            #[serde(default = "default_retention")]
            retention: usize,
        }

        fn default_path() -> PathBuf {
            PathBuf::from("logs/messages.json")
        }

        const fn default_retention() -> usize {
            DEFAULT_RETENTION
        }

        let helper = FileOutcomeStoreHelper::deserialize(deserializer)?;

        FileOutcomeStore::builder()
            .path(helper.path)
            .retention(helper.retention)
            .build()
            .map_err(serde::de::Error::custom)
    }
}

impl FileOutcomeStore {
    /// Reject paths that escape upwards or point into system directories
    fn validate_path(path: &Path) -> Result<(), ValidationError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(ValidationError::ParentDirectory(path.display().to_string()));
        }

        if let Some(prefix) = SYSTEM_PREFIXES.into_iter().find(|p| path.starts_with(p)) {
            return Err(ValidationError::SystemDirectory {
                prefix,
                path: path.display().to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn builder() -> FileOutcomeStoreBuilder {
        FileOutcomeStoreBuilder::default()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "messages.json".into(), |n| n.to_string_lossy());
        self.path.with_file_name(format!(".tmp_{name}"))
    }

    /// Prepare the log location
    ///
    /// Creates the parent directory when missing, refuses a path that names a
    /// directory, and removes a temp file orphaned by a crash mid-append.
    ///
    /// # Errors
    /// - If the parent directory cannot be created
    /// - If the path exists but is a directory
    pub async fn init(&self) -> crate::Result<()> {
        internal!("Initialising outcome log at {}", self.path.display());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !fs::try_exists(parent).await?
        {
            internal!("{} does not exist, creating...", parent.display());
            fs::create_dir_all(parent).await?;
        }

        if fs::try_exists(&self.path).await? && fs::metadata(&self.path).await?.is_dir() {
            return Err(ValidationError::NotAFile(self.path.display().to_string()).into());
        }

        let temp = self.temp_path();
        if fs::try_exists(&temp).await? {
            fs::remove_file(&temp).await?;
            internal!(
                level = INFO,
                "Removed orphaned temp file {}",
                temp.display()
            );
        }

        Ok(())
    }

    async fn read_log(&self) -> crate::Result<VecDeque<Outcome>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(VecDeque::new()),
            Err(err) => return Err(err.into()),
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(VecDeque::new());
        }

        Ok(serde_json::from_slice(&content)?)
    }

    async fn write_log(&self, outcomes: &VecDeque<Outcome>) -> crate::Result<()> {
        let encoded = serde_json::to_vec_pretty(outcomes)?;
        let temp = self.temp_path();

        fs::write(&temp, &encoded).await?;
        fs::rename(&temp, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for FileOutcomeStore {
    #[traced(instrument(level = tracing::Level::DEBUG, skip(self, outcome)), timing(precision = "ms"))]
    async fn append(&self, outcome: &Outcome) -> crate::Result<()> {
        let _guard = self.lock.lock().await;

        let mut outcomes = self.read_log().await?;
        outcomes.push_back(outcome.clone());
        while outcomes.len() > self.retention {
            outcomes.pop_front();
        }

        self.write_log(&outcomes).await?;

        internal!(
            level = DEBUG,
            "Recorded {} -> {} ({:?}), {} outcomes retained",
            outcome.account,
            outcome.recipient,
            outcome.status,
            outcomes.len()
        );

        Ok(())
    }

    #[traced(instrument(level = tracing::Level::DEBUG, skip(self)), timing(precision = "ms"))]
    async fn load(&self) -> crate::Result<Vec<Outcome>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_log().await?.into())
    }

    fn retention(&self) -> usize {
        self.retention
    }
}

/// Builder for `FileOutcomeStore`
#[derive(Debug)]
pub struct FileOutcomeStoreBuilder {
    path: PathBuf,
    retention: usize,
}

impl Default for FileOutcomeStoreBuilder {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/messages.json"),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl FileOutcomeStoreBuilder {
    #[must_use]
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub const fn retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Build the final `FileOutcomeStore`
    ///
    /// # Errors
    /// Returns an error if the path is unsafe or retention is zero
    pub fn build(self) -> Result<FileOutcomeStore, LedgerError> {
        FileOutcomeStore::validate_path(&self.path)?;
        if self.retention == 0 {
            return Err(ValidationError::ZeroRetention.into());
        }

        Ok(FileOutcomeStore {
            path: self.path,
            retention: self.retention,
            lock: Arc::default(),
        })
    }
}
