// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Analyzer configuration, loadable from a TOML file.
//!
//! ```toml
//! deny_warnings = true
//! mutex_scope_warnings = false
//! ```

use std::path::{Path, PathBuf};

use hoist_check::CheckOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Report warnings as errors.
    pub deny_warnings: bool,
    /// Warn about suspensions inside lock statements.
    pub mutex_scope_warnings: bool,
    pub report_unreachable_suspensions: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            deny_warnings: false,
            mutex_scope_warnings: true,
            report_unreachable_suspensions: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CheckConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            mutex_scope_warnings: self.mutex_scope_warnings,
            report_unreachable_suspensions: self.report_unreachable_suspensions,
        }
    }
}
