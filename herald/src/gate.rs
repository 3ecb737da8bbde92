//! Single-use access keys
//!
//! Keys live in a JSON file `{"active": [..], "used": [..]}`. A key moves from
//! `active` to `used` the first time it validates, and is rejected forever
//! after.

use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use herald_common::internal;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub const KEY_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed key file: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub seed_keys: Vec<String>,
}

fn default_path() -> PathBuf {
    PathBuf::from("./access_keys.json")
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            seed_keys: Vec::new(),
        }
    }
}

impl GateConfig {
    #[must_use]
    pub fn into_gate(self) -> KeyGate {
        KeyGate::new(self.path, self.seed_keys)
    }
}

/// Both key sets, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySets {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValidation {
    pub valid: bool,
    pub message: &'static str,
}

impl KeyValidation {
    const fn new(valid: bool, message: &'static str) -> Self {
        Self { valid, message }
    }
}

#[derive(Debug, Clone)]
pub struct KeyGate {
    path: PathBuf,
    seed_keys: Vec<String>,
    lock: Arc<Mutex<()>>,
}

impl KeyGate {
    pub fn new(path: impl Into<PathBuf>, seed_keys: Vec<String>) -> Self {
        Self {
            path: path.into(),
            seed_keys,
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the key file, creating it from the seed keys if absent
    async fn read(&self) -> Result<KeySets, GateError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                internal!(
                    level = INFO,
                    "Creating key file {} with {} seed key(s)",
                    self.path.display(),
                    self.seed_keys.len()
                );

                let sets = KeySets {
                    active: self.seed_keys.clone(),
                    used: Vec::new(),
                };
                self.write(&sets).await?;
                Ok(sets)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, sets: &KeySets) -> Result<(), GateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "keys".into(), |n| n.to_string_lossy().into_owned());
        let temp = self.path.with_file_name(format!(".tmp_{file_name}"));

        tokio::fs::write(&temp, serde_json::to_vec_pretty(sets)?).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        Ok(())
    }

    /// Generate and persist `count` fresh keys
    ///
    /// # Errors
    /// If the key file cannot be read or written
    pub async fn issue(&self, count: usize) -> Result<Vec<String>, GateError> {
        let _guard = self.lock.lock().await;
        let mut sets = self.read().await?;

        let issued = fresh_keys(&sets, count, &mut rand::rng());
        sets.active.extend(issued.iter().cloned());
        self.write(&sets).await?;

        internal!(level = INFO, "Issued {count} key(s)");
        Ok(issued)
    }

    /// Redeem a key
    ///
    /// # Errors
    /// If the key file cannot be read or written
    pub async fn validate(&self, key: &str) -> Result<KeyValidation, GateError> {
        let _guard = self.lock.lock().await;
        let mut sets = self.read().await?;

        if sets.used.iter().any(|k| k == key) {
            return Ok(KeyValidation::new(false, "Key has already been used"));
        }

        let Some(position) = sets.active.iter().position(|k| k == key) else {
            return Ok(KeyValidation::new(false, "Invalid key"));
        };

        let key = sets.active.remove(position);
        sets.used.push(key);
        self.write(&sets).await?;

        Ok(KeyValidation::new(true, "Key activated"))
    }

    /// # Errors
    /// If the key file cannot be read
    pub async fn list(&self) -> Result<KeySets, GateError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}

/// `count` keys distinct from each other and from every key in `sets`
fn fresh_keys<R: Rng>(sets: &KeySets, count: usize, rng: &mut R) -> Vec<String> {
    let taken: HashSet<&str> = sets
        .active
        .iter()
        .chain(&sets.used)
        .map(String::as_str)
        .collect();

    let mut issued: Vec<String> = Vec::with_capacity(count);
    while issued.len() < count {
        let key: String = (0..KEY_LENGTH)
            .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
            .collect();
        if !taken.contains(key.as_str()) && !issued.contains(&key) {
            issued.push(key);
        }
    }
    issued
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_fresh_keys_shape() {
        let keys = fresh_keys(&KeySets::default(), 10, &mut StdRng::seed_from_u64(1));

        assert_eq!(keys.len(), 10);
        for key in &keys {
            assert_eq!(key.len(), KEY_LENGTH);
            assert!(key.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_fresh_keys_avoid_existing() {
        let existing = fresh_keys(&KeySets::default(), 5, &mut StdRng::seed_from_u64(7));
        let sets = KeySets {
            active: existing[..3].to_vec(),
            used: existing[3..].to_vec(),
        };

        // Same seed, so the generator proposes the existing keys first
        let keys = fresh_keys(&sets, 5, &mut StdRng::seed_from_u64(7));
        for key in &keys {
            assert!(!existing.contains(key));
        }
    }

    #[test]
    fn test_key_sets_tolerate_missing_fields() {
        let sets: KeySets = serde_json::from_str(r#"{"active": ["A"]}"#).unwrap();
        assert_eq!(
            sets,
            KeySets {
                active: vec!["A".into()],
                used: Vec::new(),
            }
        );
    }
}
