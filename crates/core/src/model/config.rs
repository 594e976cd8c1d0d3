use thiserror::Error;

use crate::model::kind::SessionKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionConfigError {
    #[error("session duration must be between 1 and {max} seconds, got {got}")]
    InvalidDuration { got: u64, max: u32 },
}

/// Per-session settings fixed when the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    total_duration_secs: u32,
    show_explanations: bool,
    shuffle_seed: Option<u64>,
}

impl SessionConfig {
    /// Four hours.
    pub const MAX_DURATION_SECS: u32 = 14_400;

    /// Largest number of items one session may draw.
    pub const MAX_ITEMS: u32 = 200;

    /// # Errors
    ///
    /// Returns `SessionConfigError::InvalidDuration` for a zero or overly long duration.
    pub fn new(total_duration_secs: u32, show_explanations: bool) -> Result<Self, SessionConfigError> {
        validate_duration(u64::from(total_duration_secs))?;
        Ok(Self {
            total_duration_secs,
            show_explanations,
            shuffle_seed: None,
        })
    }

    /// Defaults used by each assessment surface.
    ///
    /// - quizzes: 10 minutes, explanations shown after each answer
    /// - coding: 45 minutes, no explanations
    /// - interviews: 30 minutes, no explanations
    #[must_use]
    pub fn default_for(kind: SessionKind) -> Self {
        let (total_duration_secs, show_explanations) = match kind {
            SessionKind::Mcq => (600, true),
            SessionKind::Coding => (2_700, false),
            SessionKind::Interview => (1_800, false),
        };
        Self {
            total_duration_secs,
            show_explanations,
            shuffle_seed: None,
        }
    }

    /// Shuffle the resolved items with a deterministic seed before starting.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn total_duration_secs(&self) -> u32 {
        self.total_duration_secs
    }

    #[must_use]
    pub fn show_explanations(&self) -> bool {
        self.show_explanations
    }

    #[must_use]
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }
}

fn validate_duration(secs: u64) -> Result<(), SessionConfigError> {
    if secs == 0 || secs > u64::from(SessionConfig::MAX_DURATION_SECS) {
        return Err(SessionConfigError::InvalidDuration {
            got: secs,
            max: SessionConfig::MAX_DURATION_SECS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_duration() {
        assert!(matches!(
            SessionConfig::new(0, false),
            Err(SessionConfigError::InvalidDuration { got: 0, .. })
        ));
    }

    #[test]
    fn defaults_show_explanations_only_for_quizzes() {
        assert!(SessionConfig::default_for(SessionKind::Mcq).show_explanations());
        assert!(!SessionConfig::default_for(SessionKind::Coding).show_explanations());
    }
}
