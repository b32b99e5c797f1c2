//! Process configuration read from the environment.
//!
//! | variable                      | default               |
//! |-------------------------------|-----------------------|
//! | `DISPENSER_PROFILES_PATH`     | `drink_profiles.json` |
//! | `DISPENSER_CLOCK`             | `real`                |
//! | `DISPENSER_DEFAULT_VOLUME_ML` | `300`                 |
//!
//! Unset variables take their default; set-but-invalid values are an error.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROFILES_PATH_VAR: &str = "DISPENSER_PROFILES_PATH";
pub const CLOCK_VAR: &str = "DISPENSER_CLOCK";
pub const DEFAULT_VOLUME_VAR: &str = "DISPENSER_DEFAULT_VOLUME_ML";

pub const DEFAULT_PROFILES_PATH: &str = "drink_profiles.json";
pub const DEFAULT_VOLUME_ML: f64 = 300.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: unknown clock mode {value:?} (expected \"real\" or \"virtual\")")]
    InvalidClock { var: &'static str, value: String },

    #[error("{var}: {value:?} is not a positive volume")]
    InvalidVolume { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// How pour durations are realised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Actually wait for each pour.
    #[default]
    Real,
    /// Account for pour time without sleeping.
    Virtual,
}

impl FromStr for ClockMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(ClockMode::Real),
            "virtual" => Ok(ClockMode::Virtual),
            _ => Err(ConfigError::InvalidClock {
                var: CLOCK_VAR,
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClockMode::Real => "real",
            ClockMode::Virtual => "virtual",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispenserConfig {
    pub profiles_path: PathBuf,
    pub clock: ClockMode,
    pub default_volume_ml: f64,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            profiles_path: PathBuf::from(DEFAULT_PROFILES_PATH),
            clock: ClockMode::Real,
            default_volume_ml: DEFAULT_VOLUME_ML,
        }
    }
}

impl DispenserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(PROFILES_PATH_VAR) {
            if path.trim().is_empty() {
                return Err(ConfigError::Empty {
                    var: PROFILES_PATH_VAR,
                });
            }
            config.profiles_path = PathBuf::from(path);
        }

        if let Some(clock) = lookup(CLOCK_VAR) {
            config.clock = clock.parse()?;
        }

        if let Some(raw) = lookup(DEFAULT_VOLUME_VAR) {
            config.default_volume_ml = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or(ConfigError::InvalidVolume {
                    var: DEFAULT_VOLUME_VAR,
                    value: raw,
                })?;
        }

        Ok(config)
    }

    pub fn with_profiles_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profiles_path = path.into();
        self
    }

    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_take_defaults() {
        let config = DispenserConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DispenserConfig::default());
        assert_eq!(config.default_volume_ml, 300.0);
    }

    #[test]
    fn all_variables_are_read() {
        let config = DispenserConfig::from_lookup(lookup(&[
            (PROFILES_PATH_VAR, "/var/lib/dispenser/profiles.json"),
            (CLOCK_VAR, "Virtual"),
            (DEFAULT_VOLUME_VAR, "250"),
        ]))
        .unwrap();

        assert_eq!(config.profiles_path, PathBuf::from("/var/lib/dispenser/profiles.json"));
        assert_eq!(config.clock, ClockMode::Virtual);
        assert_eq!(config.default_volume_ml, 250.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = DispenserConfig::from_lookup(lookup(&[(CLOCK_VAR, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidClock { .. }));

        for bad in ["0", "-5", "lots", "NaN"] {
            let err = DispenserConfig::from_lookup(lookup(&[(DEFAULT_VOLUME_VAR, bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidVolume { .. }), "{bad}");
        }

        let err = DispenserConfig::from_lookup(lookup(&[(PROFILES_PATH_VAR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty { var: PROFILES_PATH_VAR });
    }
}
