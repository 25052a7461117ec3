//! Session configuration.
//!
//! Defaults suit a standard robot. Override through environment variables,
//! a YAML file, or explicit construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory used for the filesystem calibration store when none is configured.
pub const DEFAULT_CALIBRATION_DIR: &str = "calibration";

/// Robot-wide settings a calibration session consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// The deck carries the short 850 ml fixed trash instead of the 1100 ml one.
    pub short_fixed_trash: bool,
    /// Root of the filesystem calibration store.
    pub calibration_dir: PathBuf,
    /// Treat a default tip rack without a stored tip length as calibrated.
    pub implicit_default_tip_length: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            short_fixed_trash: false,
            calibration_dir: PathBuf::from(DEFAULT_CALIBRATION_DIR),
            implicit_default_tip_length: false,
        }
    }
}

impl CalibrationConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PCAL_SHORT_FIXED_TRASH` (default: `false`)
    /// - `PCAL_CALIBRATION_DIR` (default: `calibration`)
    /// - `PCAL_IMPLICIT_DEFAULT_TIP_LENGTH` (default: `false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            short_fixed_trash: env_bool(&lookup, "PCAL_SHORT_FIXED_TRASH", defaults.short_fixed_trash)?,
            calibration_dir: lookup("PCAL_CALIBRATION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.calibration_dir),
            implicit_default_tip_length: env_bool(
                &lookup,
                "PCAL_IMPLICIT_DEFAULT_TIP_LENGTH",
                defaults.implicit_default_tip_length,
            )?,
        })
    }

    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

fn env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var: var.to_string(),
            value: raw,
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool { var: String, value: String },
    #[error("cannot read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}
