use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Settings shared by every build. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BuildConfig {
    /// Turn open valences left at the end into radical electrons instead of
    /// failing.
    pub allow_radicals: bool,

    /// Log the whole name tree and every valence violation when a build
    /// fails, not just the first error.
    pub detailed_failure_analysis: bool,

    /// Upper bound on any multiplier: substituent and root copies, ring
    /// assembly members, fusion prefix copies.
    pub max_multiplier: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            allow_radicals: false,
            detailed_failure_analysis: false,
            max_multiplier: default_max_multiplier(),
        }
    }
}

const fn default_max_multiplier() -> u32 {
    64
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl BuildConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads the configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn with_allow_radicals(mut self, allow: bool) -> Self {
        self.allow_radicals = allow;
        self
    }
}
