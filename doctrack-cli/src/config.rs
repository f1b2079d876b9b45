//! Layered configuration for the `doctrack` binary.
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. a config file (`--config`, else `doctrack.toml` / `doctrack.yaml` / `doctrack.yml` in the working directory)
//! 3. `DOCTRACK_*` environment variables
//! 4. command-line flags

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix, e.g. `DOCTRACK_DATABASE_PATH`.
pub const ENV_PREFIX: &str = "DOCTRACK_";

/// File names probed in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAMES: &[&str] = &["doctrack.toml", "doctrack.yaml", "doctrack.yml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The file extension is not one we can parse
    #[error("unsupported configuration file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Extraction failed
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] figment::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctrackConfig {
    /// SQLite file holding field values.
    pub database_path: PathBuf,
    /// Directory with custom `definitions/` and `templates/`.
    pub schema_dir: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for DoctrackConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(doctrack_store::DEFAULT_DB_FILENAME),
            schema_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

/// Values given on the command line. Unset flags leave lower layers alone.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,
}

impl DoctrackConfig {
    /// Resolve the configuration relative to the current working directory.
    pub fn load(explicit: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&cwd, explicit, overrides)
    }

    /// Resolve the configuration, probing `dir` for a config file.
    pub fn load_from(dir: &Path, explicit: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(DoctrackConfig::default()));

        if let Some(path) = config_file(dir, explicit)? {
            debug!(path = %path.display(), "loading configuration file");
            figment = match extension(&path) {
                Some("toml") => figment.merge(Toml::file(&path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(&path)),
                _ => return Err(ConfigError::UnsupportedFormat { path }),
            };
        }

        let config: DoctrackConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
            .extract()?;
        debug!(?config, "configuration resolved");
        Ok(config)
    }
}

fn config_file(dir: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }
    Ok(CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file()))
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn clear_env() {
        for key in ["DATABASE_PATH", "SCHEMA_DIR", "LOG_LEVEL"] {
            std::env::remove_var(format!("{ENV_PREFIX}{key}"));
        }
    }

    #[test]
    #[serial]
    fn defaults_without_any_source() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let config = DoctrackConfig::load_from(dir.path(), None, CliOverrides::default()).unwrap();
        assert_eq!(config, DoctrackConfig::default());
        assert_eq!(config.database_path, PathBuf::from("doctrack.db"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    #[serial]
    fn discovers_toml_in_directory() {
        clear_env();
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("doctrack.toml"),
            "database_path = \"docs.db\"\nlog_level = \"info\"\n",
        )
        .unwrap();

        let config = DoctrackConfig::load_from(dir.path(), None, CliOverrides::default()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("docs.db"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.schema_dir, None);
    }

    #[test]
    #[serial]
    fn explicit_yaml_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "schema_dir: ./schema\n").unwrap();

        let config =
            DoctrackConfig::load_from(dir.path(), Some(&path), CliOverrides::default()).unwrap();
        assert_eq!(config.schema_dir, Some(PathBuf::from("./schema")));
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let err = DoctrackConfig::load_from(
            dir.path(),
            Some(&dir.path().join("nope.toml")),
            CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    #[serial]
    fn unsupported_extension() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doctrack.ini");
        fs::write(&path, "database_path=x").unwrap();
        let err = DoctrackConfig::load_from(dir.path(), Some(&path), CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    #[serial]
    fn environment_beats_file_and_flags_beat_environment() {
        clear_env();
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("doctrack.toml"),
            "database_path = \"file.db\"\nlog_level = \"info\"\n",
        )
        .unwrap();
        std::env::set_var("DOCTRACK_DATABASE_PATH", "env.db");
        std::env::set_var("DOCTRACK_LOG_LEVEL", "debug");

        let config = DoctrackConfig::load_from(dir.path(), None, CliOverrides::default()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("env.db"));
        assert_eq!(config.log_level, "debug");

        let overrides = CliOverrides {
            database_path: Some(PathBuf::from("flag.db")),
            schema_dir: None,
        };
        let config = DoctrackConfig::load_from(dir.path(), None, overrides).unwrap();
        assert_eq!(config.database_path, PathBuf::from("flag.db"));
        assert_eq!(config.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn malformed_file_reports_parse_error() {
        clear_env();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doctrack.toml"), "database_path = [1, 2]\n").unwrap();
        let err = DoctrackConfig::load_from(dir.path(), None, CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
