//! Engine-wide settings shared by every session.

use crate::error::SettingsError;

pub const FALLBACK_VAR: &str = "PREP_FALLBACK";
pub const HISTORY_LIMIT_VAR: &str = "PREP_HISTORY_LIMIT";

/// Knobs for the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    fallback_on_unavailable: bool,
    history_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fallback_on_unavailable: true,
            history_limit: 50,
        }
    }
}

impl EngineSettings {
    /// Read overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` when a variable is set but malformed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like `from_env`, with an injectable variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` when a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(raw) = lookup(FALLBACK_VAR) {
            settings.fallback_on_unavailable = parse_bool(&raw).ok_or(SettingsError::Invalid {
                var: FALLBACK_VAR,
                raw: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(HISTORY_LIMIT_VAR) {
            settings.history_limit = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(SettingsError::Invalid {
                    var: HISTORY_LIMIT_VAR,
                    raw: raw.clone(),
                })?;
        }

        Ok(settings)
    }

    #[must_use]
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_unavailable = enabled;
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn fallback_on_unavailable(&self) -> bool {
        self.fallback_on_unavailable
    }

    #[must_use]
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let settings = EngineSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert!(settings.fallback_on_unavailable());
        assert_eq!(settings.history_limit(), 50);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = EngineSettings::from_lookup(lookup(&[
            (FALLBACK_VAR, "off"),
            (HISTORY_LIMIT_VAR, " 10 "),
        ]))
        .unwrap();
        assert!(!settings.fallback_on_unavailable());
        assert_eq!(settings.history_limit(), 10);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = EngineSettings::from_lookup(lookup(&[(HISTORY_LIMIT_VAR, "0")])).unwrap_err();
        assert_eq!(
            err,
            SettingsError::Invalid {
                var: HISTORY_LIMIT_VAR,
                raw: "0".into()
            }
        );
        assert!(EngineSettings::from_lookup(lookup(&[(FALLBACK_VAR, "maybe")])).is_err());
    }
}
