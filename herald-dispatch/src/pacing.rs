//! Inter-send delays and periodic rest pauses.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lower bound, in seconds, of the randomised inter-send delay
pub const JITTER_MIN_SECS: u64 = 20;
/// Upper bound, in seconds, of the randomised inter-send delay
pub const JITTER_MAX_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacingMode {
    /// Wait `fixed_delay_secs` between sends
    #[default]
    Fixed,
    /// Wait a uniformly random whole number of seconds in
    /// [`JITTER_MIN_SECS`, `JITTER_MAX_SECS`] between sends
    RandomJittered,
}

/// Rest interval inserted on recipient-count boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoPause {
    #[serde(default)]
    pub enabled: bool,

    /// Pause before every recipient that follows a multiple of this count
    #[serde(default = "defaults::auto_pause_after")]
    pub after: usize,

    #[serde(default = "defaults::auto_pause_duration_mins")]
    pub duration_mins: u64,
}

impl Default for AutoPause {
    fn default() -> Self {
        Self {
            enabled: false,
            after: defaults::auto_pause_after(),
            duration_mins: defaults::auto_pause_duration_mins(),
        }
    }
}

/// How a batch is spread out over time
///
/// Two independent timers: the inter-send delay after every send but the
/// last, and the auto-pause before a send on a recipient-count boundary.
/// Both are computed here and waited out by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingPolicy {
    #[serde(default)]
    pub mode: PacingMode,

    #[serde(default = "defaults::fixed_delay_secs")]
    pub fixed_delay_secs: u64,

    /// Accepted and checked for consistency, but the randomised delay always
    /// uses [`JITTER_MIN_SECS`]..=[`JITTER_MAX_SECS`]
    #[serde(default = "defaults::jitter_range")]
    pub jitter_range: (u64, u64),

    #[serde(default)]
    pub auto_pause: AutoPause,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            mode: PacingMode::default(),
            fixed_delay_secs: defaults::fixed_delay_secs(),
            jitter_range: defaults::jitter_range(),
            auto_pause: AutoPause::default(),
        }
    }
}

impl PacingPolicy {
    /// A fixed-delay policy with no auto-pause
    #[must_use]
    pub fn fixed(delay_secs: u64) -> Self {
        Self {
            fixed_delay_secs: delay_secs,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn random() -> Self {
        Self {
            mode: PacingMode::RandomJittered,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_auto_pause(mut self, after: usize, duration_mins: u64) -> Self {
        self.auto_pause = AutoPause {
            enabled: true,
            after,
            duration_mins,
        };
        self
    }

    /// # Errors
    /// - If the jitter range is inverted
    /// - If auto-pause is enabled with a zero interval
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (min, max) = self.jitter_range;
        if min > max {
            return Err(ValidationError::InvertedJitterRange { min, max });
        }

        if self.auto_pause.enabled && self.auto_pause.after == 0 {
            return Err(ValidationError::ZeroAutoPauseInterval);
        }

        Ok(())
    }

    /// Rest due before sending to the recipient at zero-based `index`
    ///
    /// Never fires before the first recipient.
    #[must_use]
    pub fn pause_before(&self, index: usize) -> Option<Duration> {
        let pause = &self.auto_pause;
        (pause.enabled && pause.after > 0 && index > 0 && index % pause.after == 0)
            .then(|| Duration::from_secs(pause.duration_mins.saturating_mul(60)))
    }

    /// Delay after sending to the recipient at zero-based `index` of `total`
    ///
    /// `None` after the last recipient.
    pub fn delay_after<R: Rng>(
        &self,
        index: usize,
        total: usize,
        rng: &mut R,
    ) -> Option<Duration> {
        if index + 1 >= total {
            return None;
        }

        let secs = match self.mode {
            PacingMode::Fixed => self.fixed_delay_secs,
            PacingMode::RandomJittered => rng.random_range(JITTER_MIN_SECS..=JITTER_MAX_SECS),
        };

        Some(Duration::from_secs(secs))
    }
}

mod defaults {
    pub const fn fixed_delay_secs() -> u64 {
        30
    }

    pub const fn jitter_range() -> (u64, u64) {
        (super::JITTER_MIN_SECS, super::JITTER_MAX_SECS)
    }

    pub const fn auto_pause_after() -> usize {
        30
    }

    pub const fn auto_pause_duration_mins() -> u64 {
        15
    }
}
