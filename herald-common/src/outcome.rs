//! Recorded result of one send attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Whether an attempt went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

impl From<bool> for OutcomeStatus {
    fn from(succeeded: bool) -> Self {
        if succeeded { Self::Success } else { Self::Failed }
    }
}

/// Why an attempt failed, as classified by the send capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The recipient cannot be reached through the service
    NotFound,
    /// Automation hiccup or timeout; the same send may work later
    Transient,
    /// The service or account refused the message
    Rejected,
    /// Internal or configuration problem on our side
    Fatal,
}

/// One send attempt, immutable once recorded
///
/// The field names on disk follow the legacy message log layout
/// (`profile`, `phone`, `status`, `timestamp`) so existing consumers keep
/// working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(rename = "profile")]
    pub account: AccountId,
    #[serde(rename = "phone")]
    pub recipient: String,
    pub status: OutcomeStatus,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Timestamps as found in message logs
///
/// RFC 3339 is written. Older logs hold local ISO-8601 datetimes without an
/// offset (`2025-03-01T10:00:00.123456`); those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| value.parse::<NaiveDateTime>().ok().map(|t| t.and_utc()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse(&value).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {value}")))
    }
}

impl Outcome {
    /// A successful attempt, stamped now
    #[must_use]
    pub fn success(account: AccountId, recipient: impl Into<String>) -> Self {
        Self {
            account,
            recipient: recipient.into(),
            status: OutcomeStatus::Success,
            timestamp: Utc::now(),
            failure: None,
        }
    }

    /// A failed attempt, stamped now
    #[must_use]
    pub fn failure(account: AccountId, recipient: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            account,
            recipient: recipient.into(),
            status: OutcomeStatus::Failed,
            timestamp: Utc::now(),
            failure: Some(kind),
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
