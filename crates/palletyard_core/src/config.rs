//! Runtime configuration for a yard session.
//!
//! # Invariants
//! - `database_path` is never empty.
//! - Missing optional keys fall back to build-mode defaults, never to
//!   process-wide state.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "scans.db";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "cannot parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YardConfig {
    /// SQLite file holding the scan log.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Text file of slot identifiers.
    #[serde(default)]
    pub layout_path: Option<PathBuf>,
    /// Packing manifest in TOML form.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for YardConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            layout_path: None,
            manifest_path: None,
            log_dir: None,
            log_level: None,
        }
    }
}

impl YardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured log level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or(default_log_level())
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, YardConfig, DEFAULT_DB_FILE_NAME};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = YardConfig::from_toml_str("").unwrap();
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DB_FILE_NAME));
        assert!(config.layout_path.is_none());
        assert!(!config.effective_log_level().is_empty());
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = YardConfig::from_toml_str(
            r#"
database_path = "/var/lib/yard/scans.db"
layout_path = "layout.txt"
log_level = " warn "
"#,
        )
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/yard/scans.db"));
        assert_eq!(config.layout_path, Some(PathBuf::from("layout.txt")));
        assert_eq!(config.effective_log_level(), "warn");
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let err = YardConfig::from_toml_str("database_path = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        let err = YardConfig::from_toml_str("database_path = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
