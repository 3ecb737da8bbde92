//! Recipients and media references

use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// A phone-number target, with optional text replacing the account message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecipient")]
pub struct Recipient {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_override: Option<String>,
}

/// Recipients may be written either as a bare address or in full
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecipient {
    Address(String),
    Full {
        address: String,
        #[serde(default)]
        text_override: Option<String>,
    },
}

impl From<RawRecipient> for Recipient {
    fn from(raw: RawRecipient) -> Self {
        match raw {
            RawRecipient::Address(address) => Self::new(address),
            RawRecipient::Full {
                address,
                text_override,
            } => Self {
                address,
                text_override,
            },
        }
    }
}

impl Recipient {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            text_override: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_override = Some(text.into());
        self
    }

    /// The text to send: the override if present, otherwise `default`
    #[must_use]
    pub fn text_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.text_override.as_deref().unwrap_or(default)
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl From<&str> for Recipient {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Reference to a caller-owned media file
///
/// The file must outlive the batch; it may be removed once the batch finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(PathBuf);

impl MediaRef {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_recipient_accepts_bare_and_full_forms() {
        let list: Vec<Recipient> =
            ron::from_str(r#"["+100", (address: "+200", text_override: Some("hey"))]"#).unwrap();

        assert_eq!(
            list,
            vec![Recipient::new("+100"), Recipient::new("+200").with_text("hey")]
        );
    }

    #[test]
    fn test_text_override() {
        let plain = Recipient::new("+100");
        assert_eq!(plain.text_or("default"), "default");

        let custom = Recipient::new("+100").with_text("custom");
        assert_eq!(custom.text_or("default"), "custom");
    }
}
