//! Runtime configuration and its discovery

use std::path::{Path, PathBuf};

use herald_ledger::LedgerConfig;
use ron::extensions::Extensions;
use serde::Deserialize;

use crate::{accounts::AccountStoreConfig, gate::GateConfig, sender::SenderConfig};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "HERALD_CONFIG";

/// Locations searched, in order, when `HERALD_CONFIG` is unset
pub const DEFAULT_CONFIG_PATHS: [&str; 2] =
    ["./herald.config.ron", "/etc/herald/herald.config.ron"];

/// Top-level configuration
///
/// ```ron
/// Herald (
///     ledger: File(path: "./logs/messages.json"),
///     sender: Command(program: "./bin/send-message", timeout_secs: 120),
///     accounts: (root: "./profiles"),
///     gate: (path: "./access_keys.json"),
/// )
/// ```
///
/// Every section may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct Herald {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub accounts: AccountStoreConfig,
    #[serde(default)]
    pub gate: GateConfig,
}

/// RON options shared by config and job files
pub fn ron_options() -> ron::Options {
    ron::Options::default()
        .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES | Extensions::IMPLICIT_SOME)
}

impl Herald {
    /// Parse a config from RON text
    ///
    /// # Errors
    /// If the text is not a valid config
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(ron_options().from_str(content)?)
    }

    /// Read and parse a config file
    ///
    /// # Errors
    /// If the file cannot be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {e}", path.display())
        })?;

        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config in {}: {e}", path.display()))
    }

    /// Load from `explicit` if given, otherwise from the first discovered file,
    /// otherwise fall back to defaults
    ///
    /// # Errors
    /// If an explicitly named or discovered file cannot be loaded
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match find_config_file() {
                Ok(path) => Self::load(&path),
                Err(_) if std::env::var_os(CONFIG_ENV).is_none() => Ok(Self::default()),
                Err(err) => Err(err),
            },
        }
    }
}

/// Find the configuration file using the following precedence:
/// 1. `HERALD_CONFIG` environment variable
/// 2. ./herald.config.ron (current working directory)
/// 3. /etc/herald/herald.config.ron (system-wide config)
///
/// # Errors
/// If `HERALD_CONFIG` names a missing file, or no default location has one
pub fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Some(env_path) = std::env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    if let Some(path) = DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
    {
        return Ok(path);
    }

    let paths_tried = DEFAULT_CONFIG_PATHS
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sender::SenderConfig;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Herald::parse("Herald()").unwrap();

        assert_eq!(
            config.ledger.path(),
            Some(Path::new("logs/messages.json"))
        );
        assert!(matches!(config.sender, SenderConfig::DryRun));
        assert_eq!(config.accounts.root, PathBuf::from("./profiles"));
        assert_eq!(config.gate.path, PathBuf::from("./access_keys.json"));
        assert!(config.gate.seed_keys.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Herald::parse(
            r#"Herald (
                ledger: Memory(retention: 10),
                sender: Command(program: "/usr/local/bin/send", args: ["--headless"], timeout_secs: 30),
                accounts: (root: "/srv/profiles"),
                gate: (path: "/srv/keys.json", seed_keys: ["ABCDEFGHIJKLMNOP"]),
            )"#,
        )
        .unwrap();

        assert!(config.ledger.path().is_none());
        let SenderConfig::Command(command) = &config.sender else {
            panic!("expected a command sender");
        };
        assert_eq!(command.program, PathBuf::from("/usr/local/bin/send"));
        assert_eq!(command.args, vec!["--headless".to_string()]);
        assert_eq!(command.timeout_secs, 30);
        assert_eq!(config.accounts.root, PathBuf::from("/srv/profiles"));
        assert_eq!(config.gate.seed_keys, vec!["ABCDEFGHIJKLMNOP".to_string()]);
    }

    #[test]
    fn test_invalid_ledger_path_is_rejected() {
        assert!(Herald::parse(r#"Herald(ledger: File(path: "../outside.json"))"#).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Herald::load(Path::new("/nonexistent/herald.config.ron")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
