//! Runtime configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe database, logging, and query settings with defaults.
//! - Reject out-of-range values at load time instead of at first use.
//!
//! # Invariants
//! - Every section and key is optional; an empty file yields `Default`.
//! - A loaded config has passed `validate()`.

use crate::repo::DEFAULT_ITEMS_PER_PAGE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_ITEMS_PER_PAGE: u32 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rotating log files. `None` logs to stderr.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub items_per_page: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl CoreConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.items_per_page == 0 || self.query.items_per_page > MAX_ITEMS_PER_PAGE {
            return Err(ConfigError::Invalid {
                key: "query.items_per_page",
                message: format!(
                    "must be between 1 and {MAX_ITEMS_PER_PAGE}, got {}",
                    self.query.items_per_page
                ),
            });
        }
        crate::logging::normalize_level(&self.logging.level).map_err(|err| {
            ConfigError::Invalid {
                key: "logging.level",
                message: err.to_string(),
            }
        })?;
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    key: "logging.dir",
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.query.items_per_page, 10);
        assert_eq!(config.database.path, None);
    }

    #[test]
    fn sections_override_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/tenantdb/app.sqlite3"

            [logging]
            level = "warn"

            [query]
            items_per_page = 25
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/tenantdb/app.sqlite3"))
        );
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.query.items_per_page, 25);
    }

    #[test]
    fn rejects_out_of_range_and_unknown_keys() {
        let err = CoreConfig::from_toml_str("[query]\nitems_per_page = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "query.items_per_page",
                ..
            }
        ));

        let err = CoreConfig::from_toml_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "logging.level", .. }));

        assert!(matches!(
            CoreConfig::from_toml_str("[database]\nurl = \"x\"").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn load_reads_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nbusy_timeout_ms = 250").unwrap();
        let config = CoreConfig::load(file.path()).unwrap();
        assert_eq!(config.database.busy_timeout_ms, 250);

        let missing = CoreConfig::load("/nonexistent/tenantdb.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
