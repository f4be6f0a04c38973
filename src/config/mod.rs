//! Checker configuration (ferrule.toml)
//!
//! The `[check]` table of a project's `ferrule.toml` controls which
//! advisory analyses run:
//!
//! ```toml
//! [check]
//! check_mem = true
//! strict = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE: &str = "ferrule.toml";

/// Build configuration consumed by the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Report potential leaks at function and module exit
    #[serde(default = "default_true")]
    pub check_mem: bool,

    /// Treat warnings as failures
    #[serde(default)]
    pub strict: bool,
}

/// On-disk layout of ferrule.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    check: Option<BuildConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            check_mem: true,
            strict: false,
        }
    }
}

impl BuildConfig {
    /// Load a configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.check.unwrap_or_default())
    }

    /// Look for ferrule.toml in `dir`, falling back to defaults
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize the configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = ConfigFile {
            check: Some(self.clone()),
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
