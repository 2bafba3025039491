//! Session configuration
//!
//! Settings an embedder can load from TOML and apply to an emulation:
//!
//! ```toml
//! # Inbound byte stream encoding: "utf8" or "legacy"
//! encoding = "utf8"
//!
//! # Named key-binding profile; unknown names fall back to the default
//! key_bindings = "default"
//!
//! # Scrollback retention: negative = unlimited, 0 = none, n = n lines
//! scrollback_lines = 10000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::decoder::Encoding;
use crate::core::screen::HistoryLimit;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Byte stream encoding.
    pub encoding: Encoding,
    /// Key-binding profile name.
    pub key_bindings: String,
    /// Scrollback lines: negative keeps everything, 0 disables.
    pub scrollback_lines: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            key_bindings: crate::keybindings::DEFAULT_PROFILE.to_string(),
            scrollback_lines: 10_000,
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn history_limit(&self) -> HistoryLimit {
        match self.scrollback_lines {
            n if n < 0 => HistoryLimit::Unbounded,
            0 => HistoryLimit::None,
            n => HistoryLimit::Bounded(n as usize),
        }
    }
}
