//! Configuration management for Strata.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Strata configuration loaded from .git/strata/config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// How branches are rebased.
    #[serde(default)]
    pub rebase: RebaseConfig,

    /// How branches are tracked.
    #[serde(default)]
    pub track: TrackConfig,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// General Strata settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote branches are pushed to.
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

/// Flags passed to every rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseConfig {
    /// Stash and restore uncommitted changes around a rebase.
    #[serde(default = "default_true")]
    pub autostash: bool,

    /// Hide git's rebase output.
    #[serde(default = "default_true")]
    pub quiet: bool,
}

impl Default for RebaseConfig {
    fn default() -> Self {
        Self {
            autostash: true,
            quiet: true,
        }
    }
}

/// Settings for `strata track`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Prompt when several branches could be a base.
    #[serde(default = "default_true")]
    pub interactive: bool,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self { interactive: true }
    }
}

const fn default_true() -> bool {
    true
}
